//! cBioPortal cancer genomics client and feature aggregation.
//!
//! Fetches mutation, expression, copy-number and clinical data for a set of
//! genes across the studies matching a cancer keyword, and condenses them
//! into compact per-gene profiles the model can reason over.

mod clinical;
mod client;
mod copy_number;
mod expression;
mod mutations;
mod report;
mod stats;

pub use clinical::{clinical_features, ClinicalSummary};
pub use client::{
    CbioPortalClient, ClinicalData, Gene, MolecularData, Mutation, ProfileIds, StudyData,
};
pub use copy_number::{cna_features, CnaFeatures};
pub use expression::{expression_features, fold_changes, ExpressionFeatures};
pub use mutations::{mutation_features, MutationFeatures};
pub use report::{build_gene_report, protein_only_report, GeneReport};

//! Tool definitions and implementations for the agent system.

use crate::biorxiv::BiorxivSearch;
use crate::config::Settings;
use crate::error::{Result, SvarError};
use crate::genomics::{self, CbioPortalClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Available tools for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Query cBioPortal for aggregated cancer genomics data.
    SearchCbioportal { genes: String, cancer_name: String },

    /// Search bioRxiv for biology preprints.
    SearchBiorxiv { query: String },

    /// Protein-only view of the genomics data.
    SearchProteinExpression { proteins: String, cancer_name: String },
}

/// Parse a named tool call with JSON arguments into a [`ToolCall`].
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let mut value: Value = serde_json::from_str(arguments)
        .map_err(|e| SvarError::Tool(format!("Invalid tool arguments: {}", e)))?;

    let object = value
        .as_object_mut()
        .ok_or_else(|| SvarError::Tool("Tool arguments must be a JSON object".to_string()))?;
    object.insert("name".to_string(), Value::String(name.to_string()));

    serde_json::from_value(value)
        .map_err(|e| SvarError::Tool(format!("Unknown tool call '{}': {}", name, e)))
}

/// Tool execution context holding the external data clients.
pub struct ToolContext {
    cbioportal: Arc<CbioPortalClient>,
    biorxiv: BiorxivSearch,
    enable_cbioportal: bool,
    enable_biorxiv: bool,
    enable_protein_expression: bool,
    max_studies: usize,
}

impl ToolContext {
    /// Build the tool context from settings, constructing each client once.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let cbioportal = Arc::new(CbioPortalClient::new(
            &settings.tools.cbioportal_base_url,
            settings.tools.request_timeout_seconds,
        )?);
        let biorxiv = BiorxivSearch::new(settings.tools.request_timeout_seconds)?;

        Ok(Self {
            cbioportal,
            biorxiv,
            enable_cbioportal: settings.agent.enable_cbioportal,
            enable_biorxiv: settings.agent.enable_biorxiv,
            enable_protein_expression: settings.agent.enable_protein_expression,
            max_studies: settings.tools.max_studies,
        })
    }

    /// Execute a tool call and return the result as a string for the model.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::SearchCbioportal { genes, cancer_name } => {
                if !self.enable_cbioportal {
                    return Err(SvarError::Tool("cBioPortal tool is disabled".to_string()));
                }
                Ok(genomics::build_gene_report(
                    &self.cbioportal,
                    genes,
                    cancer_name,
                    self.max_studies,
                )
                .await)
            }
            ToolCall::SearchBiorxiv { query } => {
                if !self.enable_biorxiv {
                    return Err(SvarError::Tool("bioRxiv tool is disabled".to_string()));
                }
                Ok(self.biorxiv.search(query).await)
            }
            ToolCall::SearchProteinExpression {
                proteins,
                cancer_name,
            } => {
                if !self.enable_protein_expression {
                    return Err(SvarError::Tool(
                        "Protein expression tool is disabled".to_string(),
                    ));
                }
                let full = genomics::build_gene_report(
                    &self.cbioportal,
                    proteins,
                    cancer_name,
                    self.max_studies,
                )
                .await;
                Ok(genomics::protein_only_report(&full))
            }
        }
    }

    /// OpenAI function/tool definitions for the enabled tools.
    pub fn definitions(&self) -> Vec<async_openai::types::ChatCompletionTool> {
        use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

        let mut tools = Vec::new();

        if self.enable_cbioportal {
            tools.push(ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: "search_cbioportal".to_string(),
                    description: Some(
                        "PRIMARY TOOL: Search cBioPortal for real-world cancer genomics data. \
                         Returns aggregated mutations, mRNA expression, protein expression (RPPA), \
                         copy number alterations and clinical data from actual patient studies. \
                         Always query this tool for gene/cancer questions instead of answering \
                         from memory. To compare cancer types, call it multiple times with the \
                         same genes and different cancer_name values."
                            .to_string(),
                    ),
                    parameters: Some(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "genes": {
                                "type": "string",
                                "description": "Comma-separated gene symbols, e.g. 'TP53,PIK3CA,EGFR,KRAS'. Query multiple genes (3-10) for comparative analysis."
                            },
                            "cancer_name": {
                                "type": "string",
                                "description": "Cancer type keyword, general ('Breast', 'Lung') or specific ('Lung Adenocarcinoma'). Matching studies are found and aggregated automatically."
                            }
                        },
                        "required": ["genes", "cancer_name"]
                    })),
                    strict: None,
                },
            });
        }

        if self.enable_biorxiv {
            tools.push(ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: "search_biorxiv".to_string(),
                    description: Some(
                        "Search bioRxiv for biology preprints. Use for recent findings not \
                         covered by the genomics database."
                            .to_string(),
                    ),
                    parameters: Some(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "query": {
                                "type": "string",
                                "description": "The search query for bioRxiv preprints"
                            }
                        },
                        "required": ["query"]
                    })),
                    strict: None,
                },
            });
        }

        if self.enable_protein_expression {
            tools.push(ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: "search_protein_expression".to_string(),
                    description: Some(
                        "Protein-only (RPPA z-score) view of the cancer genomics data. Prefer \
                         search_cbioportal, which returns mutations + mRNA + protein in one \
                         query; use this only when specifically asked for protein-only output."
                            .to_string(),
                    ),
                    parameters: Some(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "proteins": {
                                "type": "string",
                                "description": "Comma-separated protein/gene symbols, e.g. 'AKT,EGFR,TP53,PTEN'"
                            },
                            "cancer_name": {
                                "type": "string",
                                "description": "Cancer type keyword, general or specific"
                            }
                        },
                        "required": ["proteins", "cancer_name"]
                    })),
                    strict: None,
                },
            });
        }

        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call() {
        let tool = parse_tool_call(
            "search_cbioportal",
            r#"{"genes": "TP53,KRAS", "cancer_name": "Colorectal"}"#,
        )
        .unwrap();

        match tool {
            ToolCall::SearchCbioportal { genes, cancer_name } => {
                assert_eq!(genes, "TP53,KRAS");
                assert_eq!(cancer_name, "Colorectal");
            }
            other => panic!("Unexpected tool: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_tool_fails() {
        let result = parse_tool_call("search_everything", r#"{"query": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_non_object_arguments_fails() {
        let result = parse_tool_call("search_biorxiv", r#"["not", "an", "object"]"#);
        assert!(result.is_err());
    }
}

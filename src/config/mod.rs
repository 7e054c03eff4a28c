//! Configuration management for Svar.

mod settings;

pub use settings::{
    AgentSettings, BatchSettings, GeneralSettings, ModelSettings, Settings, ToolSettings,
};

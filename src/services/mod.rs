pub mod composite_merger;
pub mod cumulative_projector;
pub mod entry_service;
pub mod import_parser;
pub mod overlay_shifter;
pub mod quota_service;
pub mod report_service;
pub mod settings_service;
pub mod slot_scheme;
pub mod stat_service;
pub mod trend_analyzer;
pub mod week_boundary;

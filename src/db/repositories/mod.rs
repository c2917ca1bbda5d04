pub mod settings_repository;
pub mod stat_definition_repository;
pub mod stat_entry_repository;
pub mod stat_quota_repository;

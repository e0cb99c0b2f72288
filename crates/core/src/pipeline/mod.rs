pub mod live_annotation_use_case;
pub mod status_reporter;

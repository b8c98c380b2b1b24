pub mod note_display;
pub mod stats_panel;

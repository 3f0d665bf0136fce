// ============================================================================
// Module : store
// ============================================================================
// Entrées / sorties fichiers des tableaux de trades
// ============================================================================

pub mod csv_io; // Import / export CSV

pub use csv_io::{
    load_default_table, read_table, read_table_from_path, write_table, write_table_to_path,
    ImportError, ImportReport,
};

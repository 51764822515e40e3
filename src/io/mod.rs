//! Checkpoint slab I/O and parameter table reading.

mod slab;
mod table;

pub use slab::{
    load_2d_slice, load_3d_field, save_2d_slice, save_3d_field, slab_path, SlabError,
};
pub use table::{read_van_genuchten_table, TableError};

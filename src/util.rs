pub mod atomic_file;
pub mod checksum;

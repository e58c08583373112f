#[cfg(test)]
pub mod memory;
pub mod supabase;
pub mod traits;
pub mod types;

#[cfg(test)]
pub use memory::MemoryStore;
pub use supabase::SupabaseStore;
pub use traits::ListingStore;
pub use types::StaleQuery;

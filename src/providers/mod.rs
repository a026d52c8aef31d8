pub mod identity;
pub mod llm;
pub mod supabase;
pub mod table_store;

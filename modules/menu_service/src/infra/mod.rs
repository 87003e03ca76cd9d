//! Backend adapters: SeaORM storage and the hosted REST/auth client

pub mod storage;
pub mod supabase;

pub mod app;
pub mod chado;
pub mod config;
pub mod diopt;
pub mod domain;
pub mod error;
pub mod flybase;
pub mod output;
pub mod resolver;
pub mod scan;
pub mod workbook;

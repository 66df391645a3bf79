//! AutoAid backend
//!
//! Ciclo de vida de las reservas de servicios de mecánica: alta, asignación
//! de mecánicos, transiciones de estado, notas y estadísticas.

pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

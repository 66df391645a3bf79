//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación: la máquina
//! de estados, la autorización, el ledger, las estadísticas y la autenticación.

pub mod auth_service;
pub mod authorization_service;
pub mod booking_ledger;
pub mod booking_state_machine;
pub mod booking_stats_service;

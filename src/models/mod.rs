//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio: bookings, usuarios y
//! entradas del catálogo de servicios.

pub mod booking;
pub mod service;
pub mod user;

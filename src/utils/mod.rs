//! Вспомогательные утилиты

pub mod temp;

//! Typed error taxonomy for the snapshot subsystem.
//!
//! Каждая операция контроллера проверяет предусловия ДО любых побочных
//! эффектов и возвращает конкретный вариант:
//! - Busy             — слот сессии занят, freeze задач не удался, или
//!                      trylock низкоэнергетического перехода не взялся;
//! - PermissionDenied — операция невалидна для текущего режима/состояния;
//! - NoDevice         — swap target не задан или неизвестен;
//! - InvalidArgument  — плохой код команды или тип аргумента;
//! - OutOfSpace       — в swap-области нет свободной страницы;
//! - Io               — ошибка копирования/целостности потока образа.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapError {
    /// Session slot taken, task freeze failed, or transition trylock contended.
    #[error("busy")]
    Busy,

    /// Operation invalid for the current mode/state.
    #[error("operation not permitted in current mode/state")]
    PermissionDenied,

    /// No (or unknown) swap target.
    #[error("no swap device")]
    NoDevice,

    /// Bad command code or argument type.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No free page left in the swap area.
    #[error("swap area out of space")]
    OutOfSpace,

    /// Copy failure or image integrity violation.
    #[error("image i/o error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, SnapError>;

impl From<std::io::Error> for SnapError {
    fn from(e: std::io::Error) -> Self {
        SnapError::Io(e.to_string())
    }
}

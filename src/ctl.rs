//! ctl — командная поверхность сессии (аналог ioctl-протокола).
//!
//! Фиксированный набор привилегированных команд над одним открытым handle.
//! Код команды валидируется по верхней границе пространства (CMD_MAX),
//! тип аргумента — по команде; каждая команда возвращает типизированный
//! статус плюс опциональное out-значение.

use crate::consts::CMD_MAX;
use crate::error::{Result, SnapError};
use crate::session::Session;

/// Коды команд. Пространство 1..=CMD_MAX, выше — InvalidArgument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Cmd {
    Freeze = 1,
    Unfreeze = 2,
    CaptureAtomic = 3,
    RestoreAtomic = 4,
    FreeImage = 5,
    SetImageSizeHint = 6,
    QueryAvailableSwap = 7,
    AllocateSwapPage = 8,
    FreeSwapPages = 9,
    SetSwapTarget = 10,
    EnterLowPower = 11,
}

impl Cmd {
    /// Код → команда. InvalidArgument вне пространства команд.
    pub fn from_code(code: u32) -> Result<Cmd> {
        let cmd = match code {
            1 => Cmd::Freeze,
            2 => Cmd::Unfreeze,
            3 => Cmd::CaptureAtomic,
            4 => Cmd::RestoreAtomic,
            5 => Cmd::FreeImage,
            6 => Cmd::SetImageSizeHint,
            7 => Cmd::QueryAvailableSwap,
            8 => Cmd::AllocateSwapPage,
            9 => Cmd::FreeSwapPages,
            10 => Cmd::SetSwapTarget,
            11 => Cmd::EnterLowPower,
            _ => {
                return Err(SnapError::InvalidArgument(format!(
                    "command code {} out of range (max {})",
                    code, CMD_MAX
                )));
            }
        };
        Ok(cmd)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Входной аргумент команды.
#[derive(Debug, Clone, Copy)]
pub enum CmdArg {
    None,
    /// SetImageSizeHint: целевой размер, байты.
    U64(u64),
    /// SetSwapTarget: идентификатор swap-области.
    Device(u32),
}

/// Out-значение команды.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdOut {
    None,
    /// CaptureAtomic: restore-point флаг.
    Flag(bool),
    /// QueryAvailableSwap: свободно байт.
    Bytes(u64),
    /// AllocateSwapPage: байтовый оффсет страницы.
    Offset(u64),
}

fn want_no_arg(cmd: Cmd, arg: CmdArg) -> Result<()> {
    match arg {
        CmdArg::None => Ok(()),
        _ => Err(SnapError::InvalidArgument(format!(
            "{:?} takes no argument",
            cmd
        ))),
    }
}

/// Выполнить команду по сырому коду. Валидация кода и типа аргумента —
/// до какого-либо эффекта.
pub fn dispatch_code(session: &mut Session, code: u32, arg: CmdArg) -> Result<CmdOut> {
    dispatch(session, Cmd::from_code(code)?, arg)
}

/// Выполнить команду над сессией.
pub fn dispatch(session: &mut Session, cmd: Cmd, arg: CmdArg) -> Result<CmdOut> {
    match cmd {
        Cmd::Freeze => {
            want_no_arg(cmd, arg)?;
            session.freeze()?;
            Ok(CmdOut::None)
        }
        Cmd::Unfreeze => {
            want_no_arg(cmd, arg)?;
            session.unfreeze()?;
            Ok(CmdOut::None)
        }
        Cmd::CaptureAtomic => {
            want_no_arg(cmd, arg)?;
            let cp = session.capture_atomic()?;
            Ok(CmdOut::Flag(cp.restore_point))
        }
        Cmd::RestoreAtomic => {
            want_no_arg(cmd, arg)?;
            session.restore_atomic()?;
            Ok(CmdOut::None)
        }
        Cmd::FreeImage => {
            want_no_arg(cmd, arg)?;
            session.free_image();
            Ok(CmdOut::None)
        }
        Cmd::SetImageSizeHint => match arg {
            CmdArg::U64(n) => {
                session.set_image_size_hint(n);
                Ok(CmdOut::None)
            }
            _ => Err(SnapError::InvalidArgument(
                "SetImageSizeHint expects a u64 byte count".into(),
            )),
        },
        Cmd::QueryAvailableSwap => {
            want_no_arg(cmd, arg)?;
            Ok(CmdOut::Bytes(session.query_available_swap()?))
        }
        Cmd::AllocateSwapPage => {
            want_no_arg(cmd, arg)?;
            Ok(CmdOut::Offset(session.allocate_swap_page()?))
        }
        Cmd::FreeSwapPages => {
            want_no_arg(cmd, arg)?;
            session.free_swap_pages();
            Ok(CmdOut::None)
        }
        Cmd::SetSwapTarget => match arg {
            CmdArg::Device(dev) => {
                session.set_swap_target(dev)?;
                Ok(CmdOut::None)
            }
            _ => Err(SnapError::InvalidArgument(
                "SetSwapTarget expects a device id".into(),
            )),
        },
        Cmd::EnterLowPower => {
            want_no_arg(cmd, arg)?;
            session.enter_low_power()?;
            Ok(CmdOut::None)
        }
    }
}

use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Arithmetic on machine words. Operands are two's complement 16 bit
/// and wrap on overflow.
pub struct Operation {}

impl Operation {
    pub fn add(lhs: u16, rhs: u16) -> u16 {
        (lhs as i16).wrapping_add(rhs as i16) as u16
    }

    pub fn subtract(lhs: u16, rhs: u16) -> u16 {
        (lhs as i16).wrapping_sub(rhs as i16) as u16
    }

    pub fn multiply(lhs: u16, rhs: u16) -> u16 {
        (lhs as i16).wrapping_mul(rhs as i16) as u16
    }

    /// Truncates toward zero.
    pub fn divide(lhs: u16, rhs: u16) -> Result<u16> {
        if rhs == 0 {
            return Err(error!(DivisionByZero));
        }
        Ok((lhs as i16).wrapping_div(rhs as i16) as u16)
    }

    /// Takes the sign of the dividend.
    pub fn modulo(lhs: u16, rhs: u16) -> Result<u16> {
        if rhs == 0 {
            return Err(error!(DivisionByZero));
        }
        Ok((lhs as i16).wrapping_rem(rhs as i16) as u16)
    }

    pub fn less(lhs: u16, rhs: u16) -> bool {
        (lhs as i16) < (rhs as i16)
    }

    pub fn greater(lhs: u16, rhs: u16) -> bool {
        (lhs as i16) > (rhs as i16)
    }

    /// Positive places shift left, negative shift right filling with zeros.
    pub fn logical_shift(value: u16, places: u16) -> u16 {
        match places as i16 {
            p @ 0..=15 => value << p,
            p @ -15..=-1 => value >> -p,
            _ => 0,
        }
    }

    /// Like `logical_shift` but right shifts copy the sign bit.
    pub fn arithmetic_shift(value: u16, places: u16) -> u16 {
        let value = value as i16;
        match places as i16 {
            p @ 0..=15 => (value << p) as u16,
            p @ -15..=-1 => (value >> -p) as u16,
            p if p < 0 && value < 0 => 0xffff,
            _ => 0,
        }
    }
}

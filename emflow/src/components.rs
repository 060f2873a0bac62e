//! Reusable components
//!
//! Every component exposes its ports as public fields, so applications connect them like
//! their own components. Signal ports carry `()`.

mod combine;
mod convert;
mod counter;
mod invert;
mod split;
mod timer;
mod timestamp;
mod toggle;

pub use combine::Combine;
pub use convert::Convert;
pub use counter::{Counter, UpDownCounter};
pub use invert::Invert;
pub use split::Split;
pub use timer::{SoftwareTimer, Timer};
pub use timestamp::Timestamp;
pub use toggle::Toggle;

/// Builds an array from a fallible constructor, stopping at the first error
fn try_array<T, E, const N: usize>(
    mut f: impl FnMut(usize) -> Result<T, E>,
) -> Result<[T; N], E> {
    let mut items: heapless::Vec<T, N> = heapless::Vec::new();
    for i in 0..N {
        let item = f(i)?;
        if items.push(item).is_err() {
            unreachable!()
        }
    }
    match items.into_array() {
        Ok(array) => Ok(array),
        Err(_) => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_array() {
        let array: Result<[usize; 3], ()> = try_array(|i| Ok(i * 2));
        assert_eq!(array, Ok([0, 2, 4]));

        let mut calls = 0;
        let array: Result<[usize; 3], usize> = try_array(|i| {
            calls += 1;
            if i == 1 { Err(i) } else { Ok(i) }
        });
        assert_eq!(array, Err(1));
        assert_eq!(calls, 2);
    }
}

pub use anyhow::{ensure, Result};
pub use num_traits::{Num, NumCast, ToPrimitive};
pub use std::{
    convert::{TryFrom, TryInto},
    ops::Mul,
};

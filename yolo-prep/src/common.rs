pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::{abs_diff_eq, assert_abs_diff_eq};
pub use bbox::{prelude::*, CyCxHW, HW, TLBR};
pub use byteorder::{LittleEndian, ReadBytesExt as _, WriteBytesExt as _};
pub use image::{imageops::FilterType, Rgb, RgbImage};
pub use itertools::{iproduct, izip, Itertools as _};
pub use ::label::Label;
pub use log::{debug, info, warn};
pub use ndarray::{s, Array2, Array3, ArrayD, ArrayView4, ArrayViewD, Axis, IxDyn, Zip};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    fs,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    iter,
    path::{Path, PathBuf},
};

//! 64-bit S2 cell ids: 3 face bits, then two Hilbert-curve bits per level, then a
//! trailing marker bit.

use super::coords::{self, Xyz, MAX_SIZE};
use std::sync::OnceLock;

pub(crate) const MAX_LEVEL: u8 = 30;
const POS_BITS: u32 = 2 * MAX_LEVEL as u32 + 1;

const LOOKUP_BITS: u32 = 4;
const LOOKUP_MASK: u64 = (1 << LOOKUP_BITS) - 1;
const SWAP_MASK: usize = 0x01;
const INVERT_MASK: usize = 0x02;

/// Sub-cell (i, j) bits visited at each Hilbert position, per orientation.
const POS_TO_IJ: [[usize; 4]; 4] = [[0, 1, 3, 2], [0, 2, 3, 1], [3, 2, 0, 1], [3, 1, 0, 2]];
const POS_TO_ORIENTATION: [usize; 4] = [SWAP_MASK, 0, 0, INVERT_MASK | SWAP_MASK];

const TABLE_LEN: usize = 1 << (2 * LOOKUP_BITS + 2);

struct Tables {
    pos: [u16; TABLE_LEN],
    ij: [u16; TABLE_LEN],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(|| {
        let mut tables = Tables {
            pos: [0; TABLE_LEN],
            ij: [0; TABLE_LEN],
        };
        for orientation in [0, SWAP_MASK, INVERT_MASK, SWAP_MASK | INVERT_MASK] {
            init_lookup_cell(&mut tables, 0, 0, 0, orientation, 0, orientation);
        }
        tables
    })
}

/// Build the Hilbert lookup tables now rather than on first use.
pub fn init_tables() {
    tables();
}

fn init_lookup_cell(
    tables: &mut Tables,
    level: u32,
    i: usize,
    j: usize,
    orig_orientation: usize,
    pos: usize,
    orientation: usize,
) {
    if level == LOOKUP_BITS {
        let ij = (i << LOOKUP_BITS) + j;
        tables.pos[(ij << 2) + orig_orientation] = ((pos << 2) + orientation) as u16;
        tables.ij[(pos << 2) + orig_orientation] = ((ij << 2) + orientation) as u16;
        return;
    }
    let (i, j, pos) = (i << 1, j << 1, pos << 2);
    let order = POS_TO_IJ[orientation];
    for (index, sub) in order.iter().enumerate() {
        init_lookup_cell(
            tables,
            level + 1,
            i + (sub >> 1),
            j + (sub & 1),
            orig_orientation,
            pos + index,
            orientation ^ POS_TO_ORIENTATION[index],
        );
    }
}

/// A cell in the S2 hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct S2CellId(u64);

impl S2CellId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }

    /// Level-0 cell covering a whole cube face.
    pub fn from_face(face: u8) -> Self {
        Self((u64::from(face) << POS_BITS) + lsb_for_level(0))
    }

    pub fn from_lat_lng(lat: f64, lng: f64) -> Self {
        Self::from_point(coords::lat_lng_to_xyz(lat, lng))
    }

    pub(crate) fn from_point(p: Xyz) -> Self {
        let (face, u, v) = coords::xyz_to_face_uv(p);
        let i = coords::st_to_ij(coords::uv_to_st(u));
        let j = coords::st_to_ij(coords::uv_to_st(v));
        Self::from_face_ij(face, i, j)
    }

    /// Leaf cell at face coordinates `(i, j)`, both in `0..MAX_SIZE`.
    pub(crate) fn from_face_ij(face: u8, i: i64, j: i64) -> Self {
        let table = &tables().pos;
        let mut n = u64::from(face) << (POS_BITS - 1);
        let mut bits = (face as usize) & SWAP_MASK;
        let (i, j) = (i as u64, j as u64);
        for k in (0..8).rev() {
            let shift = k * LOOKUP_BITS;
            bits += (((i >> shift) & LOOKUP_MASK) << (LOOKUP_BITS + 2)) as usize;
            bits += (((j >> shift) & LOOKUP_MASK) << 2) as usize;
            bits = table[bits] as usize;
            n |= ((bits >> 2) as u64) << (k * 2 * LOOKUP_BITS);
            bits &= SWAP_MASK | INVERT_MASK;
        }
        Self(n * 2 + 1)
    }

    /// Like [`S2CellId::from_face_ij`] but accepts coordinates one step off the
    /// face, resolving them onto the adjacent face.
    fn from_face_ij_wrap(face: u8, i: i64, j: i64) -> Self {
        let i = i.clamp(-1, MAX_SIZE);
        let j = j.clamp(-1, MAX_SIZE);
        let scale = 1.0 / MAX_SIZE as f64;
        let limit = 1.0 + f64::EPSILON;
        let u = (scale * (2 * (i - MAX_SIZE / 2) + 1) as f64).clamp(-limit, limit);
        let v = (scale * (2 * (j - MAX_SIZE / 2) + 1) as f64).clamp(-limit, limit);
        let (face, u, v) = coords::xyz_to_face_uv(coords::face_uv_to_xyz(face, u, v));
        Self::from_face_ij(
            face,
            coords::st_to_ij(0.5 * (u + 1.0)),
            coords::st_to_ij(0.5 * (v + 1.0)),
        )
    }

    fn from_face_ij_same(face: u8, i: i64, j: i64, same_face: bool) -> Self {
        if same_face {
            Self::from_face_ij(face, i, j)
        } else {
            Self::from_face_ij_wrap(face, i, j)
        }
    }

    /// `(face, i, j)` of a leaf cell inside this cell.
    pub(crate) fn to_face_ij(self) -> (u8, i64, i64) {
        let table = &tables().ij;
        let face = self.face();
        let mut bits = (face as usize) & SWAP_MASK;
        let (mut i, mut j) = (0i64, 0i64);
        for k in (0..8).rev() {
            let nbits = if k == 7 {
                u32::from(MAX_LEVEL) - 7 * LOOKUP_BITS
            } else {
                LOOKUP_BITS
            };
            let chunk = (self.0 >> (k * 2 * LOOKUP_BITS + 1)) & ((1u64 << (2 * nbits)) - 1);
            bits += (chunk << 2) as usize;
            bits = table[bits] as usize;
            i += ((bits >> (LOOKUP_BITS + 2)) as i64) << (k * LOOKUP_BITS);
            j += (((bits >> 2) as u64 & LOOKUP_MASK) as i64) << (k * LOOKUP_BITS);
            bits &= SWAP_MASK | INVERT_MASK;
        }
        (face, i, j)
    }

    pub fn face(self) -> u8 {
        (self.0 >> POS_BITS) as u8
    }

    fn lsb(self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    pub fn is_valid(self) -> bool {
        self.face() < 6 && (self.lsb() & 0x1555_5555_5555_5555) != 0
    }

    pub fn level(self) -> u8 {
        MAX_LEVEL - (self.0.trailing_zeros() / 2) as u8
    }

    /// Ancestor at `level`; `level` must not exceed [`S2CellId::level`].
    pub fn parent(self, level: u8) -> Self {
        let lsb = lsb_for_level(level);
        Self((self.0 & lsb.wrapping_neg()) | lsb)
    }

    /// The four cells sharing an edge with this one, at the same level, in the order
    /// bottom, right, top, left.
    pub fn edge_neighbors(self) -> [S2CellId; 4] {
        let level = self.level();
        let size = size_ij(level);
        let (face, i, j) = self.to_face_ij();
        [
            Self::from_face_ij_same(face, i, j - size, j - size >= 0).parent(level),
            Self::from_face_ij_same(face, i + size, j, i + size < MAX_SIZE).parent(level),
            Self::from_face_ij_same(face, i, j + size, j + size < MAX_SIZE).parent(level),
            Self::from_face_ij_same(face, i - size, j, i - size >= 0).parent(level),
        ]
    }

    /// `(u_lo, u_hi, v_lo, v_hi)` of the cell on its face.
    fn uv_bounds(self) -> (f64, f64, f64, f64) {
        let size = size_ij(self.level());
        let (_, i, j) = self.to_face_ij();
        let (i_lo, j_lo) = (i & !(size - 1), j & !(size - 1));
        let edge = |lo: i64| {
            (
                coords::st_to_uv(lo as f64 / MAX_SIZE as f64),
                coords::st_to_uv((lo + size) as f64 / MAX_SIZE as f64),
            )
        };
        let (u_lo, u_hi) = edge(i_lo);
        let (v_lo, v_hi) = edge(j_lo);
        (u_lo, u_hi, v_lo, v_hi)
    }

    /// Corners as `(lat, lng)` in counter-clockwise order.
    pub fn vertices(self) -> [(f64, f64); 4] {
        let face = self.face();
        let (u_lo, u_hi, v_lo, v_hi) = self.uv_bounds();
        [(u_lo, v_lo), (u_hi, v_lo), (u_hi, v_hi), (u_lo, v_hi)]
            .map(|(u, v)| coords::xyz_to_lat_lng(coords::face_uv_to_xyz(face, u, v)))
    }

    /// Center in `(lat, lng)`, taken at the midpoint of the cell in (s, t) space.
    pub fn center(self) -> (f64, f64) {
        let size = size_ij(self.level());
        let (face, i, j) = self.to_face_ij();
        let (i_lo, j_lo) = (i & !(size - 1), j & !(size - 1));
        let mid = |lo: i64| coords::st_to_uv((2 * lo + size) as f64 / (2 * MAX_SIZE) as f64);
        coords::xyz_to_lat_lng(coords::face_uv_to_xyz(face, mid(i_lo), mid(j_lo)))
    }

    /// Hex id with trailing zeros stripped; `"X"` for the zero id.
    pub fn to_token(self) -> String {
        if self.0 == 0 {
            return "X".to_string();
        }
        let hex = format!("{:016x}", self.0);
        hex.trim_end_matches('0').to_string()
    }

    /// Inverse of [`S2CellId::to_token`]. Returns `None` for malformed or invalid ids.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty()
            || token.len() > 16
            || !token.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        let padded = format!("{:0<16}", token);
        let id = Self(u64::from_str_radix(&padded, 16).ok()?);
        id.is_valid().then_some(id)
    }
}

fn lsb_for_level(level: u8) -> u64 {
    1u64 << (2 * u32::from(MAX_LEVEL - level))
}

/// Cell edge length in leaf units.
fn size_ij(level: u8) -> i64 {
    1i64 << (MAX_LEVEL - level)
}

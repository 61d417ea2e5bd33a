// SPDX-License-Identifier: Apache-2.0
//! Difference-bound matrices.
//!
//! A DBM of dimension `D` is a `D × D` matrix of [`Bound`]s over clocks
//! `c_0, …, c_{D-1}`, where `c_0` is the fictitious zero clock. Entry
//! `(i, j)` constrains `c_i - c_j`. The matrix is *tight* when every entry
//! equals its shortest-path closure; all operations below preserve tightness
//! on non-empty inputs unless stated otherwise.
//!
//! Emptiness convention: every operation that produces an empty zone writes a
//! bound strictly below `≤ 0` into entry `(0, 0)`. [`Dbm::is_empty`] only
//! inspects that sentinel, which makes it a valid detector exactly on
//! matrices produced by this module.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::bound::{Bound, BoundError, Cmp, INFINITY_VALUE};

/// Sentinel for "no clock bound" in L/U/M tables: the clock is unbounded and
/// extrapolation must not constrain it.
pub const UNBOUNDED: i64 = -INFINITY_VALUE;

/// Result of an operation that can empty a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    /// The zone became empty; the `(0, 0)` sentinel has been written.
    Empty,
    /// The zone is non-empty and tight.
    NonEmpty,
}

/// Result of a partial operation that does not re-establish tightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialStatus {
    /// Emptiness was proven; the `(0, 0)` sentinel has been written.
    Empty,
    /// Emptiness cannot be decided without a global [`Dbm::tighten`].
    MayBeEmpty,
}

/// A difference-bound matrix with flat row-major storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Dbm {
    dim: usize,
    data: Box<[Bound]>,
}

impl Dbm {
    /// The universal zone: `≤ 0` on the diagonal, `+∞` elsewhere. Tight.
    pub fn universal(dim: usize) -> Self {
        debug_assert!(dim >= 1);
        let mut dbm = Self {
            dim,
            data: vec![Bound::LT_INFINITY; dim * dim].into_boxed_slice(),
        };
        for i in 0..dim {
            dbm.set(i, i, Bound::LE_ZERO);
        }
        dbm
    }

    /// The universal positive zone: universal with `c_i >= 0` for every
    /// clock. Tight.
    pub fn universal_positive(dim: usize) -> Self {
        let mut dbm = Self::universal(dim);
        for j in 1..dim {
            dbm.set(0, j, Bound::LE_ZERO);
        }
        dbm
    }

    /// The zone containing the single valuation where all clocks are 0:
    /// every entry `≤ 0`. Tight.
    pub fn zero(dim: usize) -> Self {
        debug_assert!(dim >= 1);
        Self {
            dim,
            data: vec![Bound::LE_ZERO; dim * dim].into_boxed_slice(),
        }
    }

    /// An empty zone, marked by `≤ -1` on the diagonal. Not tight.
    pub fn unsatisfiable(dim: usize) -> Self {
        let mut dbm = Self::zero(dim);
        for i in 0..dim {
            dbm.set(i, i, Bound::LE_MINUS_ONE);
        }
        dbm
    }

    /// Dimension of the matrix (number of clocks including the zero clock).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry `(i, j)`, the bound on `c_i - c_j`.
    pub fn at(&self, i: usize, j: usize) -> Bound {
        self.data[i * self.dim + j]
    }

    /// Writes entry `(i, j)`.
    ///
    /// Low-level accessor: the caller is responsible for restoring tightness
    /// afterwards (usually via [`Self::tighten`] or [`Self::tighten_one`]).
    pub fn set(&mut self, i: usize, j: usize, b: Bound) {
        self.data[i * self.dim + j] = b;
    }

    /// Emptiness sentinel test: `(0, 0) < ≤ 0`.
    pub fn is_empty(&self) -> bool {
        self.at(0, 0) < Bound::LE_ZERO
    }

    /// Whether every diagonal entry is exactly `≤ 0`.
    pub fn is_consistent(&self) -> bool {
        (0..self.dim).all(|i| self.at(i, i) == Bound::LE_ZERO)
    }

    /// Whether the matrix equals its shortest-path closure.
    pub fn is_tight(&self) -> bool {
        for i in 0..self.dim {
            for j in 0..self.dim {
                for k in 0..self.dim {
                    let Ok(path) = self.at(i, k).sum(self.at(k, j)) else {
                        continue;
                    };
                    if path < self.at(i, j) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether this is the universal zone. Assumes tightness.
    pub fn is_universal(&self) -> bool {
        self.indices()
            .all(|(i, j)| i == j || self.at(i, j) == Bound::LT_INFINITY)
    }

    /// Whether every clock is non-negative: `(0, j) ≤ ≤ 0`. Assumes tightness.
    pub fn is_positive(&self) -> bool {
        (1..self.dim).all(|j| self.at(0, j) <= Bound::LE_ZERO)
    }

    /// Whether this is the universal positive zone. Assumes tightness.
    pub fn is_universal_positive(&self) -> bool {
        (1..self.dim).all(|j| self.at(0, j) == Bound::LE_ZERO)
            && self
                .indices()
                .all(|(i, j)| i == j || i == 0 || self.at(i, j) == Bound::LT_INFINITY)
    }

    /// Entrywise inclusion: `self ⊆ other`. Assumes both tight.
    pub fn is_le(&self, other: &Self) -> bool {
        debug_assert_eq!(self.dim, other.dim);
        self.data.iter().zip(other.data.iter()).all(|(a, b)| a <= b)
    }

    /// Structural equality of tight matrices denotes zone equality.
    pub fn is_equal(&self, other: &Self) -> bool {
        self == other
    }

    /// Floyd–Warshall shortest-path closure.
    ///
    /// Returns [`ZoneStatus::Empty`] (writing the `(0, 0)` sentinel with the
    /// offending diagonal value) when a negative cycle exists, otherwise
    /// leaves the matrix tight.
    pub fn tighten(&mut self) -> Result<ZoneStatus, BoundError> {
        let dim = self.dim;
        for k in 0..dim {
            for i in 0..dim {
                let dik = self.at(i, k);
                if dik.is_infinite() {
                    continue;
                }
                for j in 0..dim {
                    let dkj = self.at(k, j);
                    if dkj.is_infinite() {
                        continue;
                    }
                    let path = dik.sum(dkj)?;
                    if path < self.at(i, j) {
                        self.set(i, j, path);
                    }
                }
            }
            for i in 0..dim {
                let dii = self.at(i, i);
                if dii < Bound::LE_ZERO {
                    self.set(0, 0, dii);
                    return Ok(ZoneStatus::Empty);
                }
            }
        }
        Ok(ZoneStatus::NonEmpty)
    }

    /// Local tightening after entry `(x, y)` was lowered, assuming every
    /// other entry was tight beforehand. Propagates paths through the arc
    /// `x → y` only.
    pub fn tighten_one(&mut self, x: usize, y: usize) -> Result<ZoneStatus, BoundError> {
        debug_assert!(x != y);
        let dim = self.dim;
        let dxy = self.at(x, y);
        if dxy.is_infinite() {
            return Ok(ZoneStatus::NonEmpty);
        }
        for i in 0..dim {
            let dix = self.at(i, x);
            if dix.is_infinite() {
                continue;
            }
            let through = dix.sum(dxy)?;
            if through < self.at(i, y) {
                self.set(i, y, through);
            }
        }
        for j in 0..dim {
            let dyj = self.at(y, j);
            if dyj.is_infinite() {
                continue;
            }
            for i in 0..dim {
                let diy = self.at(i, y);
                if diy.is_infinite() {
                    continue;
                }
                let through = diy.sum(dyj)?;
                if through < self.at(i, j) {
                    self.set(i, j, through);
                }
            }
        }
        for i in 0..dim {
            let dii = self.at(i, i);
            if dii < Bound::LE_ZERO {
                self.set(0, 0, dii);
                return Ok(ZoneStatus::Empty);
            }
        }
        Ok(ZoneStatus::NonEmpty)
    }

    /// Intersects with the constraint `c_x - c_y ≺ v`. Preserves tightness.
    pub fn constrain(
        &mut self,
        x: usize,
        y: usize,
        cmp: Cmp,
        value: i64,
    ) -> Result<ZoneStatus, BoundError> {
        self.constrain_bound(x, y, Bound::new(cmp, value)?)
    }

    /// Intersects with `c_x - c_y ≺ b`. A `+∞` bound is a no-op.
    pub fn constrain_bound(&mut self, x: usize, y: usize, b: Bound) -> Result<ZoneStatus, BoundError> {
        debug_assert!(x != y);
        if b >= self.at(x, y) {
            return Ok(ZoneStatus::NonEmpty);
        }
        self.set(x, y, b);
        self.tighten_one(x, y)
    }

    /// Entrywise minimum with `other`, without restoring tightness.
    pub fn min_with(&mut self, other: &Self) -> PartialStatus {
        debug_assert_eq!(self.dim, other.dim);
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            if *b < *a {
                *a = *b;
            }
        }
        if self.is_empty() {
            PartialStatus::Empty
        } else {
            PartialStatus::MayBeEmpty
        }
    }

    /// Intersection with `other`: entrywise minimum followed by tightening.
    pub fn intersect(&mut self, other: &Self) -> Result<ZoneStatus, BoundError> {
        if self.min_with(other) == PartialStatus::Empty {
            return Ok(ZoneStatus::Empty);
        }
        self.tighten()
    }

    /// Fresh intersection of two tight matrices.
    pub fn intersection(a: &Self, b: &Self) -> Result<(Self, ZoneStatus), BoundError> {
        let mut out = a.clone();
        let status = out.intersect(b)?;
        Ok((out, status))
    }

    /// Symbolic assignment `c_x := c_y + v`.
    ///
    /// Three shapes, each `O(D)`: reset to constant (`y = 0`), increment
    /// (`x = y`), alias plus offset (`x ≠ y`, `v ≥ 0`). Sequential semantics:
    /// when several resets reference each other, the caller must apply them
    /// in order. Preserves tightness.
    pub fn reset(&mut self, x: usize, y: usize, value: i64) -> Result<(), BoundError> {
        debug_assert!(x >= 1);
        if x == y {
            // increment: c_x := c_x + v
            let up = Bound::le(value)?;
            let down = Bound::le(-value)?;
            for j in 0..self.dim {
                if j == x {
                    continue;
                }
                let row = self.at(x, j).sum(up)?;
                self.set(x, j, row);
                let col = self.at(j, x).sum(down)?;
                self.set(j, x, col);
            }
            return Ok(());
        }
        // c_x := c_y + v (reset to constant when y = 0)
        let up = Bound::le(value)?;
        let down = Bound::le(-value)?;
        for j in 0..self.dim {
            if j == x {
                continue;
            }
            let row = up.sum(self.at(y, j))?;
            self.set(x, j, row);
            let col = self.at(j, y).sum(down)?;
            self.set(j, x, col);
        }
        self.set(x, x, Bound::LE_ZERO);
        Ok(())
    }

    /// Resets `c_x` to 0.
    pub fn reset_to_zero(&mut self, x: usize) -> Result<(), BoundError> {
        self.reset(x, 0, 0)
    }

    /// Time elapse: clears every upper bound `(i, 0)`. Preserves tightness.
    pub fn open_up(&mut self) {
        for i in 1..self.dim {
            self.set(i, 0, Bound::LT_INFINITY);
        }
    }

    /// Time predecessors: relaxes every lower bound `(0, j)` to `≤ 0`, then
    /// restores tightness. Cannot empty a non-empty zone.
    pub fn open_down(&mut self) -> Result<(), BoundError> {
        for j in 1..self.dim {
            if self.at(0, j) < Bound::LE_ZERO {
                self.set(0, j, Bound::LE_ZERO);
            }
        }
        // relaxation cannot introduce a negative cycle
        self.tighten().map(|_| ())
    }

    /// Forgets every constraint on `c_x` except positivity. Preserves
    /// tightness.
    pub fn free_clock(&mut self, x: usize) {
        debug_assert!(x >= 1);
        for j in 0..self.dim {
            if j == x {
                continue;
            }
            self.set(x, j, Bound::LT_INFINITY);
            let col = self.at(j, 0);
            self.set(j, x, col);
        }
        self.set(x, x, Bound::LE_ZERO);
    }

    /// Inverse image of the reset `c_x := 0`: constrains `c_x = 0`, then
    /// frees `c_x`. Returns [`ZoneStatus::Empty`] when 0 is outside the
    /// zone's range for `c_x`.
    pub fn unreset_to_zero(&mut self, x: usize) -> Result<ZoneStatus, BoundError> {
        if self.constrain_bound(x, 0, Bound::LE_ZERO)? == ZoneStatus::Empty {
            return Ok(ZoneStatus::Empty);
        }
        if self.constrain_bound(0, x, Bound::LE_ZERO)? == ZoneStatus::Empty {
            return Ok(ZoneStatus::Empty);
        }
        self.free_clock(x);
        Ok(ZoneStatus::NonEmpty)
    }

    /// Multiplies every finite off-diagonal bound by `factor >= 1`.
    pub fn scale(&mut self, factor: i64) -> Result<(), BoundError> {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if i == j {
                    continue;
                }
                let scaled = self.at(i, j).scale(factor)?;
                self.set(i, j, scaled);
            }
        }
        Ok(())
    }

    /// ExtraM extrapolation with clock bounds `m` (entry 0 ignored;
    /// [`UNBOUNDED`] means "do not constrain").
    pub fn extra_m(&mut self, m: &[i64]) -> Result<(), BoundError> {
        self.extra_lu(m, m)
    }

    /// ExtraM+ extrapolation with clock bounds `m`.
    pub fn extra_m_plus(&mut self, m: &[i64]) -> Result<(), BoundError> {
        self.extra_lu_plus(m, m)
    }

    /// ExtraLU extrapolation with lower bounds `l` and upper bounds `u`.
    ///
    /// Entries above `(≤, L(i))` become `+∞`; entries below `(≤, -U(j))`
    /// become `(<, -U(j))`. Row 0 is clamped back to at most `≤ 0` so the
    /// result stays positive. The result is tight.
    pub fn extra_lu(&mut self, l: &[i64], u: &[i64]) -> Result<(), BoundError> {
        debug_assert_eq!(l.len(), self.dim);
        debug_assert_eq!(u.len(), self.dim);
        for i in 0..self.dim {
            for j in 0..self.dim {
                if i == j {
                    continue;
                }
                let c = self.at(i, j);
                if i >= 1 && exceeds_upper(c, l[i]) {
                    self.set(i, j, Bound::LT_INFINITY);
                } else if j >= 1 && below_lower(c, u[j]) {
                    self.set(i, j, lower_replacement(u[j])?);
                }
            }
        }
        self.clamp_row_zero();
        // an extrapolation only grows the zone, so it stays non-empty
        self.tighten().map(|_| ())
    }

    /// ExtraLU+ extrapolation: ExtraLU strengthened to also clear entries
    /// whose row or column clock lies entirely beyond its bound.
    pub fn extra_lu_plus(&mut self, l: &[i64], u: &[i64]) -> Result<(), BoundError> {
        debug_assert_eq!(l.len(), self.dim);
        debug_assert_eq!(u.len(), self.dim);
        let snapshot = self.clone();
        for i in 0..self.dim {
            for j in 0..self.dim {
                if i == j {
                    continue;
                }
                let c = snapshot.at(i, j);
                let row_beyond = i >= 1 && below_lower(snapshot.at(0, i), l[i]);
                let col_beyond = below_lower(snapshot.at(0, j), u[j]);
                if i >= 1 && (exceeds_upper(c, l[i]) || row_beyond || (j >= 1 && col_beyond)) {
                    self.set(i, j, Bound::LT_INFINITY);
                } else if i == 0 && col_beyond {
                    self.set(i, j, lower_replacement(u[j])?);
                }
            }
        }
        self.clamp_row_zero();
        self.tighten().map(|_| ())
    }

    fn clamp_row_zero(&mut self) {
        for j in 1..self.dim {
            if self.at(0, j) > Bound::LE_ZERO {
                self.set(0, j, Bound::LE_ZERO);
            }
        }
    }

    /// Lexical comparison: dimension first, then row-major entries.
    pub fn lexical_cmp(&self, other: &Self) -> Ordering {
        self.dim
            .cmp(&other.dim)
            .then_with(|| self.data.cmp(&other.data))
    }

    /// Writes the zone as a conjunction of clock constraints, naming clock
    /// `i >= 1` through `name`. The universal positive zone prints `true`.
    pub fn write_constraints<W: fmt::Write>(
        &self,
        w: &mut W,
        name: &dyn Fn(usize) -> String,
    ) -> fmt::Result {
        let mut first = true;
        let mut sep = |w: &mut W, first: &mut bool| -> fmt::Result {
            if *first {
                *first = false;
            } else {
                w.write_str(" & ")?;
            }
            Ok(())
        };
        for i in 1..self.dim {
            let low = self.at(0, i);
            if low < Bound::LE_ZERO {
                sep(w, &mut first)?;
                let op = match low.cmp_part() {
                    Cmp::Le => ">=",
                    Cmp::Lt => ">",
                };
                write!(w, "{}{}{}", name(i), op, -low.value())?;
            }
            let up = self.at(i, 0);
            if !up.is_infinite() {
                sep(w, &mut first)?;
                write!(w, "{}{}{}", name(i), up.cmp_part(), up.value())?;
            }
            for j in 1..self.dim {
                if i == j {
                    continue;
                }
                let d = self.at(i, j);
                if !d.is_infinite() {
                    sep(w, &mut first)?;
                    write!(w, "{}-{}{}{}", name(i), name(j), d.cmp_part(), d.value())?;
                }
            }
        }
        if first {
            w.write_str("true")?;
        }
        Ok(())
    }

    fn indices(&self) -> impl Iterator<Item = (usize, usize)> {
        let dim = self.dim;
        (0..dim).flat_map(move |i| (0..dim).map(move |j| (i, j)))
    }
}

/// `c > (≤, bound)`, with [`UNBOUNDED`] meaning the test always succeeds.
fn exceeds_upper(c: Bound, bound: i64) -> bool {
    if bound == UNBOUNDED {
        return true;
    }
    match Bound::le(bound) {
        Ok(b) => c > b,
        Err(_) => false,
    }
}

/// `c < (≤, -bound)`, with [`UNBOUNDED`] meaning the test always succeeds.
fn below_lower(c: Bound, bound: i64) -> bool {
    if bound == UNBOUNDED {
        return true;
    }
    match Bound::le(-bound) {
        Ok(b) => c < b,
        Err(_) => false,
    }
}

/// `(<, -bound)`, saturating to `+∞` for [`UNBOUNDED`].
fn lower_replacement(bound: i64) -> Result<Bound, BoundError> {
    if bound == UNBOUNDED {
        Ok(Bound::LT_INFINITY)
    } else {
        Bound::lt(-bound)
    }
}

/// Inclusion modulo aM abstraction: `z1 ⊆ aM(z2)` without materializing the
/// abstraction. Both zones must be non-empty and tight.
pub fn is_am_le(z1: &Dbm, z2: &Dbm, m: &[i64]) -> bool {
    is_alu_le(z1, z2, m, m)
}

/// Inclusion modulo aLU abstraction: `z1 ⊆ aLU(z2)`.
///
/// Implements the simulation-based test of Herbreteau, Srivathsan and
/// Walukiewicz (LICS 2012): an entry violation `z2(y, x) < z1(y, x)` is
/// benign when the whole of `z1` lies beyond `U(x)`, or when pulling `c_y`
/// down below its `z2` bound stays above `L(y)`.
pub fn is_alu_le(z1: &Dbm, z2: &Dbm, l: &[i64], u: &[i64]) -> bool {
    debug_assert_eq!(z1.dim(), z2.dim());
    debug_assert!(!z1.is_empty() && !z2.is_empty());
    let dim = z1.dim();
    for x in 0..dim {
        // Column x is irrelevant when every valuation of z1 has c_x > U(x).
        let ux = if x == 0 { 0 } else { u[x] };
        if ux == UNBOUNDED {
            continue;
        }
        let Ok(le_minus_ux) = Bound::le(-ux) else {
            continue;
        };
        if z1.at(0, x) < le_minus_ux {
            continue;
        }
        for y in 0..dim {
            if y == x || z2.at(y, x) >= z1.at(y, x) {
                continue;
            }
            if y == 0 {
                return false;
            }
            if l[y] == UNBOUNDED {
                continue;
            }
            let Ok(lt_minus_ly) = Bound::lt(-l[y]) else {
                continue;
            };
            let benign = match z2.at(y, x).sum(lt_minus_ly) {
                Ok(s) => s >= z1.at(0, x),
                // overflow can only make the slack larger
                Err(_) => true,
            };
            if !benign {
                return false;
            }
        }
    }
    true
}

impl Hash for Dbm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dim.hash(state);
        self.data.hash(state);
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{:>8}", self.at(i, j).to_string())?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dbm(dim={})\n{self}", self.dim)
    }
}

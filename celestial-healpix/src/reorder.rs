//! Whole-map reordering and NESTED hierarchy navigation.

use crate::healpix::Healpix;
use crate::scheme::Scheme;
use celestial_core::{SphereError, SphereResult};

impl Healpix {
    /// Permutes a RING-ordered map into NESTED order.
    ///
    /// # Errors
    /// `SizeMismatch` if `map.len() != npix`, `UnsupportedScheme` if nside is not
    /// a power of two.
    pub fn reorder_ring_to_nest<T: Copy>(&self, map: &[T]) -> SphereResult<Vec<T>> {
        let order = self.require_order("reorder_ring_to_nest")?;
        self.check_map_len(map.len(), "reorder_ring_to_nest")?;
        // every slot is written exactly once; start from a copy to avoid T: Default
        let mut out = map.to_vec();
        for (ring_pix, &value) in map.iter().enumerate() {
            let (x, y, face) = self.ring2xyf(ring_pix as i64);
            out[self.xyf2nest(x, y, face, order) as usize] = value;
        }
        tracing::debug!(npix = map.len(), "reordered map RING -> NESTED");
        Ok(out)
    }

    /// Permutes a NESTED-ordered map into RING order.
    pub fn reorder_nest_to_ring<T: Copy>(&self, map: &[T]) -> SphereResult<Vec<T>> {
        let order = self.require_order("reorder_nest_to_ring")?;
        self.check_map_len(map.len(), "reorder_nest_to_ring")?;
        let mut out = map.to_vec();
        for (nest_pix, &value) in map.iter().enumerate() {
            let (x, y, face) = self.nest2xyf(nest_pix as i64, order);
            out[self.xyf2ring(x, y, face) as usize] = value;
        }
        tracing::debug!(npix = map.len(), "reordered map NESTED -> RING");
        Ok(out)
    }

    /// NESTED index of the pixel one order coarser that contains `pix`.
    ///
    /// # Errors
    /// `UnsupportedScheme` unless the scheme is NESTED; `InvalidParameter` at order 0.
    pub fn nest_parent(&self, pix: u64) -> SphereResult<u64> {
        let order = self.require_nested("nest_parent")?;
        self.check_pixel(pix)?;
        if order == 0 {
            return Err(SphereError::invalid_parameter(
                "order",
                "base pixels have no parent",
            ));
        }
        Ok(pix >> 2)
    }

    /// NESTED indices of the four pixels one order finer that make up `pix`.
    pub fn nest_children(&self, pix: u64) -> SphereResult<[u64; 4]> {
        let order = self.require_nested("nest_children")?;
        self.check_pixel(pix)?;
        if order >= crate::ORDER_MAX {
            return Err(SphereError::invalid_parameter(
                "order",
                format!("pixels at order {order} cannot be subdivided further"),
            ));
        }
        let first = pix << 2;
        Ok([first, first + 1, first + 2, first + 3])
    }

    fn require_nested(&self, operation: &str) -> SphereResult<u32> {
        if self.scheme() != Scheme::Nested {
            return Err(SphereError::unsupported_scheme(
                operation,
                "requires NESTED ordering",
            ));
        }
        self.require_order(operation)
    }

    fn check_map_len(&self, len: usize, context: &str) -> SphereResult<()> {
        if len as u64 != self.npix() {
            return Err(SphereError::size_mismatch(context, self.npix() as usize, len));
        }
        Ok(())
    }
}

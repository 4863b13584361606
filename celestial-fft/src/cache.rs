//! Process-wide plan cache.
//!
//! Plans are built once per length and handed out as `Arc`s. The maps only
//! grow; a lost race to insert simply drops the duplicate plan.

use crate::plan::ComplexFft;
use crate::real::RealFft;
use celestial_core::SphereResult;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

static COMPLEX_PLANS: Lazy<RwLock<HashMap<usize, Arc<ComplexFft>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static REAL_PLANS: Lazy<RwLock<HashMap<usize, Arc<RealFft>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn get_or_build<P>(
    cache: &RwLock<HashMap<usize, Arc<P>>>,
    n: usize,
    build: impl FnOnce(usize) -> SphereResult<P>,
) -> SphereResult<Arc<P>> {
    {
        let plans = cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(plan) = plans.get(&n) {
            return Ok(Arc::clone(plan));
        }
    }
    let plan = Arc::new(build(n)?);
    let mut plans = cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(Arc::clone(plans.entry(n).or_insert(plan)))
}

/// Shared complex FFT plan of length `n`.
pub fn plan_complex(n: usize) -> SphereResult<Arc<ComplexFft>> {
    get_or_build(&COMPLEX_PLANS, n, ComplexFft::new)
}

/// Shared real FFT plan of length `n`.
pub fn plan_real(n: usize) -> SphereResult<Arc<RealFft>> {
    get_or_build(&REAL_PLANS, n, RealFft::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plans_are_shared() {
        let a = plan_complex(96).unwrap();
        let b = plan_complex(96).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let r1 = plan_real(30).unwrap();
        let r2 = plan_real(30).unwrap();
        assert!(Arc::ptr_eq(&r1, &r2));
    }

    #[test]
    fn test_invalid_length_not_cached() {
        assert!(plan_complex(0).is_err());
        assert!(plan_real(0).is_err());
    }

    #[test]
    fn test_concurrent_lookup() {
        let handles: Vec<_> = (0..8)
            .map(|i| std::thread::spawn(move || plan_real(40 + 2 * (i % 3)).map(|p| p.len())))
            .collect();
        for h in handles {
            let len = h.join().unwrap().unwrap();
            assert!([40, 42, 44].contains(&len));
        }
    }
}

//! Per-package fan-out on a bounded Rayon pool.

use rayon::prelude::*;
use tracing::warn;

/// Apply `work` to every package on a pool of `workers` threads, keeping the
/// input order.  Falls back to sequential processing when the pool cannot be
/// built.
pub fn map_packages<T, F>(packages: &[String], workers: usize, work: F) -> Vec<T>
where
    T: Send,
    F: Fn(&str) -> T + Sync + Send,
{
    if packages.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            packages
                .par_iter()
                .map(|package| work(package.as_str()))
                .collect()
        }),
        Err(e) => {
            warn!("falling back to sequential processing: {e}");
            packages.iter().map(|package| work(package.as_str())).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_input_order() {
        let packages: Vec<String> = (0..64).map(|i| format!("pkg{i}")).collect();
        let names = map_packages(&packages, 4, |package| package.to_string());
        assert_eq!(names, packages);
    }

    #[test]
    fn test_zero_workers_still_runs() {
        let packages = vec!["a".to_string(), "bb".to_string()];
        assert_eq!(map_packages(&packages, 0, str::len), vec![1, 2]);
        assert!(map_packages(&[], 2, str::len).is_empty());
    }
}

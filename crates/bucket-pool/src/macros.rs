//! Public macros for nebula-bucket-pool

/// Declare a pool profile
///
/// Expands to a unit struct implementing [`PoolProfile`](crate::profile::PoolProfile)
/// with one bucket per `(block_size, block_count)` entry, in order. At least
/// one entry is required; invalid entries are rejected when the profile is
/// first used to build a pool.
///
/// # Examples
/// ```
/// use nebula_bucket_pool::pool_profile;
/// use nebula_bucket_pool::profile::PoolProfile;
///
/// pool_profile! {
///     /// Small objects only
///     pub struct Tiny { (16, 64), (64, 16) }
/// }
///
/// assert_eq!(Tiny::NAME, "Tiny");
/// assert_eq!(Tiny::BUCKETS.len(), 2);
/// ```
#[macro_export]
macro_rules! pool_profile {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $(($size:expr, $count:expr)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::profile::PoolProfile for $name {
            const NAME: &'static str = stringify!($name);
            const BUCKETS: &'static [$crate::profile::BucketSpec] = &[
                $($crate::profile::BucketSpec::new($size, $count)),+
            ];
        }
    };
}

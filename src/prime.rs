//! Prime capacities. Bucket selection is `hash % capacity`, and a prime
//! modulus keeps regular key patterns from piling into a few buckets.

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3usize;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= n`, or `None` once the search passes `limit`.
pub(crate) fn next_prime(n: usize, limit: usize) -> Option<usize> {
    let mut p = n.max(2);
    if p > 2 && p % 2 == 0 {
        p += 1;
    }
    while p <= limit {
        if is_prime(p) {
            return Some(p);
        }
        p += if p == 2 { 1 } else { 2 };
    }
    None
}

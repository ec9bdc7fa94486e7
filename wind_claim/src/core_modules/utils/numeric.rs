/// Rounds `value` to `decimals` places; exact ties go to the even neighbour.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounds_to_requested_places() {
        assert_eq!(round_to(0.8333333, 2), 0.83);
        assert_eq!(round_to(0.2007843, 3), 0.201);
        assert_eq!(round_to(2.0, 2), 2.0);
        assert_eq!(round_to(1.555, 1), 1.6);
    }

    #[test]
    fn exact_ties_go_to_even() {
        assert_eq!(round_to(2.125, 2), 2.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(-0.125, 2), -0.12);
    }
}

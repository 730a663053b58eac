use ordered_float::OrderedFloat;

lazy_static! {
    pub static ref LOG_ONE_HALF: f64 = (0.5_f64).ln();
}

pub struct MathUtils {}

impl MathUtils {
    /**
     * Stable log(exp(a) + exp(b)) for natural-log values. Negative infinity is
     * the additive identity.
     */
    pub fn log_add_exp(a: f64, b: f64) -> f64 {
        if a == f64::NEG_INFINITY {
            return b;
        }
        if b == f64::NEG_INFINITY {
            return a;
        }
        if a > b {
            a + (b - a).exp().ln_1p()
        } else {
            b + (a - b).exp().ln_1p()
        }
    }

    /**
     * Stable log(sum(exp(values))) for natural-log values. An empty slice sums
     * to negative infinity.
     */
    pub fn log_sum_exp(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NEG_INFINITY;
        }
        let max_value = *values
            .iter()
            .max_by_key(|x| OrderedFloat(**x))
            .unwrap();
        if max_value == f64::NEG_INFINITY {
            return max_value;
        }
        let sum: f64 = values
            .iter()
            .filter(|v| **v != f64::NEG_INFINITY)
            .map(|v| (v - max_value).exp())
            .sum();
        max_value + sum.ln()
    }

    /**
     * Gets the maximum element's index of an array of f64 values.
     */
    pub fn max_element_index(array: &[f64]) -> usize {
        let mut max_i = 0;
        for i in 1..array.len() {
            if array[i] > array[max_i] {
                max_i = i;
            }
        }
        max_i
    }

    /// Normalizes natural-log values into linear-space probabilities.
    pub fn normalize_from_log(array: &[f64]) -> Vec<f64> {
        let total = MathUtils::log_sum_exp(array);
        array.iter().map(|x| (x - total).exp()).collect()
    }
}

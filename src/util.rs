/// Cumulative trapezoidal integral of `values` sampled at `time`. The result
/// has the same length, starting with zero.
///
/// # Panics
/// If `values` and `time` differ in length
pub fn cumtrapz(values: &[f64], time: &[f64]) -> Vec<f64> {
    assert_eq!(values.len(), time.len());

    let mut integral = Vec::with_capacity(values.len());
    if values.is_empty() {
        return integral;
    }
    integral.push(0.0);
    integral.extend(
        values
            .windows(2)
            .zip(time.windows(2))
            .scan(0.0, |acc, (v, t)| {
                *acc += 0.5 * (v[0] + v[1]) * (t[1] - t[0]);
                Some(*acc)
            }),
    );
    integral
}

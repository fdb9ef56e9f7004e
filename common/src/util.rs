use regex::Regex;

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (divides by `n`), so a single sample gives 0
pub fn population_stddev(data: &[f64]) -> Option<f64> {
    let mean = mean(data)?;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// First run of ASCII digits in `s`
pub fn first_number(s: &str) -> Option<u32> {
    let re_digits = Regex::new(r"[0-9]+").ok()?;
    re_digits.find(s)?.as_str().parse().ok()
}

use once_cell::sync::Lazy;
use regex::Regex;

// Regex nomor HP Indonesia (08xx, 628xx, atau +628xx)
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+62|62|0)[8][0-9]{8,11}$").expect("phone regex harus valid")
});

// Validate nomor HP Indonesia (format: 08xxx atau +628xxx)
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

// Normalisasi nomor HP ke format 62xxx (tanpa +, tanpa spasi/strip)
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        format!("62{}", rest)
    } else if digits.starts_with('8') {
        format!("62{}", digits)
    } else {
        digits
    }
}

// Validate koordinat (latitude -90..90, longitude -180..180, bukan NaN)
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

// Harga dari backend: harus positif, max 10 miliar
pub fn is_valid_price(price: i64) -> bool {
    price > 0 && price <= 10_000_000_000
}

// Helper format tampilan (locale id-ID)

/// Format angka dengan pemisah ribuan titik: 12000 -> "12.000"
pub fn format_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format rupiah: 12000 -> "Rp 12.000"
pub fn format_rupiah(amount: i64) -> String {
    format!("Rp {}", format_thousands(amount))
}

/// Format sisa detik jadi "mm:ss"
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format jarak satu desimal: 12.345 -> "12.3 km"
pub fn format_km(distance_km: f64) -> String {
    format!("{:.1} km", distance_km)
}

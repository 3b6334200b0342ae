use pretty_env_logger::formatted_builder;

const NANOTONS_PER_TON: u64 = 1_000_000_000;

pub fn init_logger() -> Result<(), log::SetLoggerError> {
    let mut builder = formatted_builder();

    if let Ok(s) = ::std::env::var("RUST_LOG") {
        builder.parse_filters(&s);
    } else {
        builder.parse_filters("info");
    }

    builder.try_init()
}

/// Formats nanotons as a decimal TON amount without trailing zeros
pub fn format_ton(nanotons: u64) -> String {
    let whole = nanotons / NANOTONS_PER_TON;
    let frac = nanotons % NANOTONS_PER_TON;
    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{frac:09}");
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ton() {
        assert_eq!(format_ton(0), "0");
        assert_eq!(format_ton(1_000_000_000), "1");
        assert_eq!(format_ton(100_000_000), "0.1");
        assert_eq!(format_ton(3_500_000_001), "3.500000001");
    }
}

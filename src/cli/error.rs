// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exit with an internal error (exit code >1)
/// Internal errors are for unexpected system failures, database corruption, etc.
pub fn internal_error(message: &str) -> ! {
    eprintln!("Internal error: {}", message);
    process::exit(2);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate a hiring target (positive integer)
pub fn validate_target_count(target: i64) -> Result<(), String> {
    if target > 0 {
        Ok(())
    } else {
        Err(format!(
            "Invalid target: {}. Target headcount must be positive.",
            target
        ))
    }
}

/// Validate a conversion rate (percent in (0, 100])
pub fn validate_conversion_rate(rate: f64) -> Result<(), String> {
    if rate > 0.0 && rate <= 100.0 {
        Ok(())
    } else {
        Err(format!(
            "Invalid conversion rate: {}. Rates are percentages in (0, 100].",
            rate
        ))
    }
}

/// Validate a turnaround time (non-negative days)
pub fn validate_tat_days(tat: i64) -> Result<(), String> {
    if tat >= 0 {
        Ok(())
    } else {
        Err(format!("Invalid TAT: {}. TAT days must be non-negative.", tat))
    }
}

/// Validate a stage order (positive; the special sentinel is set via --special)
pub fn validate_stage_order(order: i64) -> Result<(), String> {
    if order > 0 {
        Ok(())
    } else {
        Err(format!(
            "Invalid stage order: {}. Chain stage orders must be positive.",
            order
        ))
    }
}

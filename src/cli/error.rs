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

/// Validate that an ID is a positive integer
pub fn validate_id(id_str: &str, kind: &str) -> Result<i64, String> {
    id_str.trim().parse::<i64>()
        .map_err(|_| format!("Invalid {} ID: '{}'. {} ID must be a number.", kind, id_str, capitalize(kind)))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid {} ID: {}. {} ID must be positive.", kind, id, capitalize(kind)))
            }
        })
}

/// Validate a unit price in USD (finite, not negative)
pub fn validate_price(value: f64) -> Result<f64, String> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("Invalid unit price: {}. Price must be a non-negative number.", value))
    }
}

/// Validate a quantity (positive integer)
pub fn validate_quantity(value: i64) -> Result<i64, String> {
    if value > 0 {
        Ok(value)
    } else {
        Err(format!("Invalid quantity: {}. Quantity must be positive.", value))
    }
}

/// Minimal email shape check: one '@' with text on both sides
pub fn validate_email(email: &str) -> Result<(), String> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(format!("Invalid email: '{}'", email)),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

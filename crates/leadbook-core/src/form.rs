//! Raw buyer input and its validation into a [`BuyerDraft`].
//!
//! JSON payloads and CSV rows both land in a [`BuyerForm`] of loosely-typed
//! text fields, so that every malformed value is reported as a field-level
//! validation error instead of a body-decoding failure.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use strum::VariantNames;

use crate::{
  FieldErrors,
  buyer::{
    Bhk, BuyerDraft, City, PropertyType, Purpose, Source, Status, Timeline,
  },
};

pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 80;
pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 15;
pub const NOTES_MAX: usize = 1000;

/// Unvalidated buyer attributes. Absent and empty values are equivalent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyerForm {
  #[serde(deserialize_with = "lenient_text")]
  pub full_name:     Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub email:         Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub phone:         Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub city:          Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub property_type: Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub bhk:           Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub purpose:       Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub budget_min:    Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub budget_max:    Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub timeline:      Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub source:        Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub status:        Option<String>,
  #[serde(deserialize_with = "lenient_text")]
  pub notes:         Option<String>,
  #[serde(deserialize_with = "lenient_tags")]
  pub tags:          Vec<String>,
}

impl BuyerForm {
  /// Validate every field, collecting all errors rather than stopping at the
  /// first. Absent enumerations take their defaults; `default_source` differs
  /// between direct entry and bulk import.
  pub fn validate(&self, default_source: Source) -> Result<BuyerDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let full_name = text(&self.full_name).unwrap_or_default().to_owned();
    let name_len = full_name.chars().count();
    if name_len < FULL_NAME_MIN {
      errors.push(
        "fullName",
        format!("Full name must be at least {FULL_NAME_MIN} characters"),
      );
    } else if name_len > FULL_NAME_MAX {
      errors.push(
        "fullName",
        format!("Full name must be at most {FULL_NAME_MAX} characters"),
      );
    }

    let email = text(&self.email).map(str::to_owned);
    if let Some(e) = &email
      && !looks_like_email(e)
    {
      errors.push("email", "Invalid email address");
    }

    let phone = text(&self.phone).unwrap_or_default().to_owned();
    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&phone.len())
      || !phone.bytes().all(|b| b.is_ascii_digit())
    {
      errors.push(
        "phone",
        format!("Phone must be {PHONE_MIN_DIGITS}-{PHONE_MAX_DIGITS} digits"),
      );
    }

    let city = choice(&mut errors, "city", &self.city, City::default());
    let property_type = choice(
      &mut errors,
      "propertyType",
      &self.property_type,
      PropertyType::default(),
    );
    let bhk = match text(&self.bhk) {
      None => None,
      Some(raw) => match Bhk::from_str(raw) {
        Ok(b) => Some(b),
        Err(_) => {
          errors.push("bhk", one_of::<Bhk>("BHK"));
          None
        }
      },
    };
    // The bedroom count only exists for residential types.
    let bhk = if property_type.requires_bhk() {
      if bhk.is_none() && !errors.has("bhk") {
        errors.push("bhk", "BHK is required for Apartment and Villa");
      }
      bhk
    } else {
      None
    };
    let purpose = choice(&mut errors, "purpose", &self.purpose, Purpose::default());

    let budget_min = budget(&mut errors, "budgetMin", &self.budget_min);
    let budget_max = budget(&mut errors, "budgetMax", &self.budget_max);
    if let (Some(min), Some(max)) = (budget_min, budget_max)
      && max < min
    {
      errors.push(
        "budgetMax",
        "Budget max must be greater than or equal to budget min",
      );
    }

    let timeline = choice(&mut errors, "timeline", &self.timeline, Timeline::default());
    let source = choice(&mut errors, "source", &self.source, default_source);
    let status = choice(&mut errors, "status", &self.status, Status::default());

    let notes = text(&self.notes).map(str::to_owned);
    if let Some(n) = &notes
      && n.chars().count() > NOTES_MAX
    {
      errors.push("notes", format!("Notes must be at most {NOTES_MAX} characters"));
    }

    let tags = self
      .tags
      .iter()
      .map(|t| t.trim())
      .filter(|t| !t.is_empty())
      .map(str::to_owned)
      .collect();

    if !errors.is_empty() {
      return Err(errors);
    }

    Ok(BuyerDraft {
      full_name,
      email,
      phone,
      city,
      property_type,
      bhk,
      purpose,
      budget_min,
      budget_max,
      timeline,
      source,
      status,
      notes,
      tags,
    })
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

/// Trimmed, non-empty text or `None`.
fn text(raw: &Option<String>) -> Option<&str> {
  raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn one_of<T: VariantNames>(label: &str) -> String {
  format!("{label} must be one of {}", T::VARIANTS.join(", "))
}

fn choice<T>(errors: &mut FieldErrors, field: &str, raw: &Option<String>, default: T) -> T
where
  T: FromStr + VariantNames,
{
  match text(raw) {
    None => default,
    Some(s) => T::from_str(s).unwrap_or_else(|_| {
      errors.push(field, one_of::<T>(&label_for(field)));
      default
    }),
  }
}

/// `propertyType` → `Property type`.
fn label_for(field: &str) -> String {
  let mut label = String::with_capacity(field.len() + 2);
  for (i, c) in field.chars().enumerate() {
    if i == 0 {
      label.extend(c.to_uppercase());
    } else if c.is_ascii_uppercase() {
      label.push(' ');
      label.push(c.to_ascii_lowercase());
    } else {
      label.push(c);
    }
  }
  label
}

fn budget(errors: &mut FieldErrors, field: &str, raw: &Option<String>) -> Option<i64> {
  let s = text(raw)?;
  match s.parse::<i64>() {
    Ok(n) if n >= 0 => Some(n),
    _ => {
      errors.push(field, "Budget must be a non-negative whole number");
      None
    }
  }
}

fn looks_like_email(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && domain.split('.').all(|part| !part.is_empty())
}

// ─── Lenient deserializers ───────────────────────────────────────────────────

/// Accept strings, numbers and booleans as text; `null` as absent.
fn lenient_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Option::<Value>::deserialize(d)? {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s),
    Some(other) => Some(other.to_string()),
  })
}

/// Anything that is not an array becomes the empty list; non-string
/// elements are dropped.
fn lenient_tags<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(d)? {
    Value::Array(items) => items
      .into_iter()
      .filter_map(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
      })
      .collect(),
    _ => Vec::new(),
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn form(value: Value) -> BuyerForm { serde_json::from_value(value).unwrap() }

  fn valid() -> Value {
    json!({
      "fullName": "Asha Verma",
      "phone": "9876543210",
      "propertyType": "Apartment",
      "bhk": "2",
    })
  }

  fn with(mut base: Value, key: &str, value: Value) -> Value {
    base[key] = value;
    base
  }

  #[test]
  fn minimal_input_takes_defaults() {
    let draft = form(valid()).validate(Source::Website).unwrap();
    assert_eq!(draft.city, City::Chandigarh);
    assert_eq!(draft.purpose, Purpose::Buy);
    assert_eq!(draft.timeline, Timeline::ZeroToThreeMonths);
    assert_eq!(draft.source, Source::Website);
    assert_eq!(draft.status, Status::New);
    assert_eq!(draft.bhk, Some(Bhk::Two));
    assert!(draft.tags.is_empty());
  }

  #[test]
  fn budget_max_below_min_is_rejected_on_budget_max() {
    let input = with(
      with(valid(), "budgetMin", json!(7_000_000)),
      "budgetMax",
      json!(5_000_000),
    );
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert!(errors.has("budgetMax"));
    assert!(!errors.has("budgetMin"));
  }

  #[test]
  fn equal_budgets_are_fine() {
    let input = with(
      with(valid(), "budgetMin", json!("5000000")),
      "budgetMax",
      json!(5_000_000),
    );
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.budget_min, Some(5_000_000));
    assert_eq!(draft.budget_max, Some(5_000_000));
  }

  #[test]
  fn apartment_without_bhk_is_rejected() {
    let input = with(valid(), "bhk", Value::Null);
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert!(errors.has("bhk"));
  }

  #[test]
  fn plot_without_bhk_is_valid() {
    let input = with(with(valid(), "propertyType", json!("Plot")), "bhk", Value::Null);
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.property_type, PropertyType::Plot);
    assert_eq!(draft.bhk, None);
  }

  #[test]
  fn bhk_is_dropped_for_non_residential_types() {
    let input = with(valid(), "propertyType", json!("Office"));
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.bhk, None);
  }

  #[test]
  fn numeric_bhk_is_accepted() {
    let input = with(valid(), "bhk", json!(3));
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.bhk, Some(Bhk::Three));
  }

  #[test]
  fn short_phone_is_rejected() {
    let input = with(valid(), "phone", json!("12"));
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert_eq!(errors.to_string(), "phone: Phone must be 10-15 digits");
  }

  #[test]
  fn phone_with_separators_is_rejected() {
    let input = with(valid(), "phone", json!("98765-43210"));
    assert!(form(input).validate(Source::Website).unwrap_err().has("phone"));
  }

  #[test]
  fn all_errors_are_collected() {
    let input = json!({ "fullName": "A", "email": "nope", "phone": "1", "city": "Delhi" });
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert!(errors.has("fullName"));
    assert!(errors.has("email"));
    assert!(errors.has("phone"));
    assert!(errors.has("city"));
    assert!(errors.has("bhk"));
  }

  #[test]
  fn unknown_enum_value_lists_choices() {
    let input = with(valid(), "timeline", json!("soon"));
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert_eq!(
      errors.to_string(),
      "timeline: Timeline must be one of 0-3m, 3-6m, >6m, Exploring"
    );
  }

  #[test]
  fn multi_word_field_label() {
    let input = with(valid(), "propertyType", json!("Castle"));
    let errors = form(input).validate(Source::Website).unwrap_err();
    assert!(errors.to_string().starts_with("propertyType: Property type must be one of"));
  }

  #[test]
  fn non_array_tags_become_empty() {
    let input = with(valid(), "tags", json!("vip"));
    let draft = form(input).validate(Source::Website).unwrap();
    assert!(draft.tags.is_empty());
  }

  #[test]
  fn tags_are_trimmed_and_non_strings_dropped() {
    let input = with(valid(), "tags", json!([" vip ", 4, "", "hot"]));
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.tags, vec!["vip", "hot"]);
  }

  #[test]
  fn blank_optional_text_is_absent() {
    let input = with(with(valid(), "email", json!("  ")), "notes", json!(""));
    let draft = form(input).validate(Source::Website).unwrap();
    assert_eq!(draft.email, None);
    assert_eq!(draft.notes, None);
  }

  #[test]
  fn long_notes_are_rejected() {
    let input = with(valid(), "notes", json!("x".repeat(NOTES_MAX + 1)));
    assert!(form(input).validate(Source::Website).unwrap_err().has("notes"));
  }

  #[test]
  fn import_source_default() {
    let draft = form(valid()).validate(Source::Import).unwrap();
    assert_eq!(draft.source, Source::Import);
  }
}

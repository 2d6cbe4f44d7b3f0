//! Customer record accepted by the prediction endpoint.
//!
//! `CustomerInput` is the wire shape; `Customer` is what the predictor sees,
//! and only exists once every field constraint holds.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single field constraint violation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerInput {
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Tenure")]
    pub tenure: i64,
    #[serde(rename = "Services_Subscribed")]
    pub services_subscribed: i64,
    #[serde(rename = "Contract_Type")]
    pub contract_type: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
}

/// Categorical field parsed from its exact wire spelling.
pub trait Category: Sized + Copy + 'static {
    const ALLOWED: &'static [(&'static str, Self)];

    fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        Self::ALLOWED
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALLOWED.iter().map(|(n, _)| *n).collect();
                ValidationError::new(field, format!("must be one of {{{}}}", names.join(", ")))
            })
    }

    fn as_str(&self) -> &'static str
    where
        Self: PartialEq,
    {
        Self::ALLOWED
            .iter()
            .find(|(_, v)| v == self)
            .map(|(n, _)| *n)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Category for Gender {
    const ALLOWED: &'static [(&'static str, Self)] =
        &[("Male", Gender::Male), ("Female", Gender::Female)];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractType {
    MonthToMonth,
    OneYear,
    TwoYear,
}

impl Category for ContractType {
    const ALLOWED: &'static [(&'static str, Self)] = &[
        ("Month-to-month", ContractType::MonthToMonth),
        ("One year", ContractType::OneYear),
        ("Two year", ContractType::TwoYear),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl Category for YesNo {
    const ALLOWED: &'static [(&'static str, Self)] = &[("Yes", YesNo::Yes), ("No", YesNo::No)];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternetService {
    Dsl,
    FiberOptic,
    No,
}

impl Category for InternetService {
    const ALLOWED: &'static [(&'static str, Self)] = &[
        ("DSL", InternetService::Dsl),
        ("Fiber optic", InternetService::FiberOptic),
        ("No", InternetService::No),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub gender: Gender,
    pub age: u8,
    pub tenure: u8,
    pub services_subscribed: u8,
    pub contract_type: ContractType,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub tech_support: YesNo,
    pub online_security: YesNo,
    pub internet_service: InternetService,
}

impl Customer {
    /// `(column, value)` pairs for the numeric features.
    pub fn numeric_features(&self) -> [(&'static str, f64); 5] {
        [
            ("Age", f64::from(self.age)),
            ("Tenure", f64::from(self.tenure)),
            ("Services_Subscribed", f64::from(self.services_subscribed)),
            ("MonthlyCharges", self.monthly_charges),
            ("TotalCharges", self.total_charges),
        ]
    }

    /// `(column, category)` pairs for the categorical features.
    pub fn categorical_features(&self) -> [(&'static str, &'static str); 5] {
        [
            ("Gender", self.gender.as_str()),
            ("Contract_Type", self.contract_type.as_str()),
            ("TechSupport", self.tech_support.as_str()),
            ("OnlineSecurity", self.online_security.as_str()),
            ("InternetService", self.internet_service.as_str()),
        ]
    }
}

impl TryFrom<CustomerInput> for Customer {
    type Error = ValidationError;

    fn try_from(input: CustomerInput) -> Result<Self, Self::Error> {
        Ok(Customer {
            gender: Gender::parse("Gender", &input.gender)?,
            age: int_in_range("Age", input.age, 18, 100)?,
            tenure: int_in_range("Tenure", input.tenure, 0, 100)?,
            services_subscribed: int_in_range("Services_Subscribed", input.services_subscribed, 0, 10)?,
            contract_type: ContractType::parse("Contract_Type", &input.contract_type)?,
            monthly_charges: positive("MonthlyCharges", input.monthly_charges)?,
            total_charges: non_negative("TotalCharges", input.total_charges)?,
            tech_support: YesNo::parse("TechSupport", &input.tech_support)?,
            online_security: YesNo::parse("OnlineSecurity", &input.online_security)?,
            internet_service: InternetService::parse("InternetService", &input.internet_service)?,
        })
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} age={} tenure={} contract={} internet={}",
            self.gender.as_str(),
            self.age,
            self.tenure,
            self.contract_type.as_str(),
            self.internet_service.as_str()
        )
    }
}

fn int_in_range(field: &'static str, value: i64, min: u8, max: u8) -> Result<u8, ValidationError> {
    if value < i64::from(min) || value > i64::from(max) {
        return Err(ValidationError::new(
            field,
            format!("must be in range [{min}, {max}], got {value}"),
        ));
    }
    u8::try_from(value).map_err(|_| ValidationError::new(field, "out of range"))
}

fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::new(
            field,
            format!("must be greater than 0, got {value}"),
        ));
    }
    Ok(value)
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(
            field,
            format!("must be greater than or equal to 0, got {value}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) fn sample_input() -> CustomerInput {
    CustomerInput {
        gender: "Male".to_string(),
        age: 45,
        tenure: 12,
        services_subscribed: 3,
        contract_type: "Month-to-month".to_string(),
        monthly_charges: 70.5,
        total_charges: 500.5,
        tech_support: "Yes".to_string(),
        online_security: "Yes".to_string(),
        internet_service: "Fiber optic".to_string(),
    }
}

//! Pure numeric formulas: estimated 1RM, Wilks score, macro split.
//!
//! Everything in this module is stateless and deterministic. Apart from
//! the Wilks score, which is defined as a 2-decimal quantity, results are
//! returned at full precision; callers round with [`round2`] at the
//! record or aggregate boundary.

use crate::Gender;

/// Pounds per kilogram, for callers converting imperial input
pub const LB_PER_KG: f64 = 2.20462;

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert pounds to kilograms
pub fn lb_to_kg(lb: f64) -> f64 {
    lb / LB_PER_KG
}

/// Estimated one-rep max using the Epley formula: `weight * (1 + reps/30)`.
///
/// A zero-rep set yields no estimate (0.0), and a true single counts as
/// itself rather than being inflated by the formula.
pub fn estimated_one_rep_max(weight: f64, reps: u32) -> f64 {
    match reps {
        0 => 0.0,
        1 => weight,
        _ => weight * (1.0 + f64::from(reps) / 30.0),
    }
}

/// Wilks score: bodyweight-normalized strength score.
///
/// Evaluates a 5th-degree polynomial in body weight (disjoint coefficient
/// sets per gender) and scales the lifted weight by `500 / poly(bw)`.
/// Inputs must already be in kilograms; see [`lb_to_kg`].
/// The result is rounded to 2 decimals.
pub fn wilks_score(body_weight_kg: f64, lifted_kg: f64, gender: Gender) -> f64 {
    let (a, b, c, d, e, f) = match gender {
        Gender::Male => (
            -216.0475144,
            16.2606339,
            -0.002388645,
            -0.00113732,
            7.01863E-06,
            -1.291E-08,
        ),
        Gender::Female => (
            594.31747775582,
            -27.23842536447,
            0.82112226871,
            -0.00930733913,
            4.731582E-05,
            -9.054E-08,
        ),
    };

    let bw = body_weight_kg;
    let poly = a + b * bw + c * bw.powi(2) + d * bw.powi(3) + e * bw.powi(4) + f * bw.powi(5);
    let coeff = 500.0 / poly;

    round2(lifted_kg * coeff)
}

/// Activity level for TDEE estimation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Very,
    Extra,
}

impl ActivityLevel {
    /// Fixed TDEE multiplier table
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Very => 1.725,
            ActivityLevel::Extra => 1.9,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "very" => Some(ActivityLevel::Very),
            "extra" => Some(ActivityLevel::Extra),
            _ => None,
        }
    }
}

/// Nutrition goal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    Cut,
    Maintain,
    Bulk,
}

impl Goal {
    /// Daily calorie adjustment relative to TDEE
    pub fn calorie_adjustment(&self) -> f64 {
        match self {
            Goal::Cut => -500.0,
            Goal::Maintain => 0.0,
            Goal::Bulk => 300.0,
        }
    }
}

/// Computed macro targets
#[derive(Clone, Debug, PartialEq)]
pub struct MacroTargets {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
}

/// Compute a daily macro split.
///
/// BMR via Mifflin-St Jeor, TDEE via the activity multiplier table, target
/// calories adjusted by goal and clamped to a gender-specific floor
/// (1500 kcal male / 1200 kcal female). Protein is allocated at 2 g/kg and
/// fat at 0.9 g/kg; carbs take the remaining calories. When protein and fat
/// alone exceed the target, fat is reduced (never below 30 g) so carbs can
/// never go negative.
pub fn macro_split(
    gender: Gender,
    age: u32,
    height_cm: f64,
    weight_kg: f64,
    activity: ActivityLevel,
    goal: Goal,
) -> MacroTargets {
    let bmr = match gender {
        Gender::Male => 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + 5.0,
        Gender::Female => 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) - 161.0,
    };

    let tdee = bmr * activity.multiplier();

    let floor = match gender {
        Gender::Male => 1500.0,
        Gender::Female => 1200.0,
    };
    let target_calories = (tdee + goal.calorie_adjustment()).max(floor);

    let protein_g = 2.0 * weight_kg;
    let mut fat_g = 0.9 * weight_kg;

    let protein_calories = protein_g * 4.0;
    let mut remaining = target_calories - protein_calories - fat_g * 9.0;

    if remaining < 0.0 {
        // Protein is kept as-is; fat gives way first, down to its floor
        fat_g = ((target_calories - protein_calories) / 9.0).max(30.0);
        remaining = (target_calories - protein_calories - fat_g * 9.0).max(0.0);
    }

    let carbs_g = remaining / 4.0;

    MacroTargets {
        bmr,
        tdee,
        target_calories,
        protein_g,
        fat_g,
        carbs_g,
    }
}

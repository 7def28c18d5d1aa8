//! Recommendation composer
//!
//! Assembles the ordered recommendation list: a class-based block, up to
//! two performance-improvement blocks, a weight-optimization block, and
//! an age-standards block. Block builders are fault-isolated — a failed
//! or empty benchmark skips that block only — and the composed list is
//! never empty: a generic fallback block covers the degenerate case.

use crate::engine::statistics::{
    age_group_statistics, class_statistics, general_successful_benchmark,
    optimal_weight_statistics, successful_profile_statistics, PerformanceBenchmark,
};
use crate::store::PopulationStore;
use fitscore_shared::models::{FitnessClass, Profile, RecommendationBlock};
use fitscore_shared::scoring;

/// Weight deviation (kg) from the optimal-weight benchmark that triggers
/// the weight-optimization block
const WEIGHT_DEVIATION_KG: i32 = 5;

/// Floors for suggested improvements
const MIN_SIT_UP_IMPROVEMENT: i32 = 5;
const MIN_BROAD_JUMP_IMPROVEMENT_CM: i32 = 10;

/// Compose the recommendation list for one prediction.
///
/// The four store-backed lookups are independent and run concurrently;
/// the block order in the result is fixed regardless of completion
/// order.
pub async fn compose(
    store: &dyn PopulationStore,
    profile: &Profile,
    class: FitnessClass,
) -> Vec<RecommendationBlock> {
    let (class_block, improvement, weight_block, age_block) = tokio::join!(
        class_based_block(store, class),
        improvement_blocks(store, profile),
        weight_optimization_block(store, profile),
        age_standards_block(store, profile),
    );

    let mut blocks = Vec::new();
    blocks.extend(class_block);
    blocks.extend(improvement);
    blocks.extend(weight_block);
    blocks.extend(age_block);

    if blocks.is_empty() {
        blocks.push(generic_block());
    }
    blocks
}

/// Class-tier block with targets drawn from the class statistics.
async fn class_based_block(
    store: &dyn PopulationStore,
    class: FitnessClass,
) -> Option<RecommendationBlock> {
    let stats = class_statistics(store, class).await;
    if stats.avg_sit_ups == 0 || stats.avg_broad_jump_cm == 0 {
        return None;
    }

    let block = match class {
        FitnessClass::A => RecommendationBlock::new(
            "🌟 Excellent Fitness Level!",
            format!(
                "You are in the top {}%! Keep up this outstanding performance.",
                stats.percentile
            ),
            vec![
                format!("Class A average sit-ups: {} repetitions", stats.avg_sit_ups),
                format!(
                    "Class A average broad jump: {}cm",
                    stats.avg_broad_jump_cm
                ),
                "Vary your training to avoid plateaus".to_string(),
            ],
        ),
        FitnessClass::B => RecommendationBlock::new(
            "💪 Good Fitness Level",
            "You are in good shape! Push your performance to reach class A.",
            vec![
                format!("Sit-up target for class A: {} repetitions", stats.target_sit_ups),
                format!(
                    "Broad jump target for class A: {}cm",
                    stats.target_broad_jump_cm
                ),
                "Increase training intensity gradually".to_string(),
            ],
        ),
        FitnessClass::C => RecommendationBlock::new(
            "⚡ Fair Fitness Level",
            "There is real potential for improvement! The data shows you can reach class B.",
            vec![
                format!("Sit-up target for class B: {} repetitions", stats.target_sit_ups),
                format!(
                    "Broad jump target for class B: {}cm",
                    stats.target_broad_jump_cm
                ),
                "Training consistency is the main key".to_string(),
            ],
        ),
        FitnessClass::D => RecommendationBlock::new(
            "🎯 Time to Start Your Fitness Journey!",
            "With consistent training you can reach class C within 3-6 months.",
            vec![
                format!(
                    "Start with a sit-up target of {} repetitions per day",
                    stats.min_sit_ups.max(5)
                ),
                format!(
                    "Initial broad jump target: {}cm",
                    stats.min_broad_jump_cm.max(100)
                ),
                "Begin with light training 3x per week".to_string(),
            ],
        ),
    };
    Some(block)
}

/// Sit-up and broad-jump improvement blocks, emitted only when the
/// profile underperforms the benchmark. Prefers the anthropometrically
/// windowed successful-profile benchmark, falls back to the general
/// class A/B average, and to a generic improvement block when no
/// benchmark data exists at all.
async fn improvement_blocks(
    store: &dyn PopulationStore,
    profile: &Profile,
) -> Vec<RecommendationBlock> {
    if let Some(bench) = successful_profile_statistics(store, profile).await {
        return compare_against(profile, &bench, BenchmarkSource::Windowed);
    }

    match general_successful_benchmark(store).await {
        Some(bench) => compare_against(profile, &bench, BenchmarkSource::General),
        None => vec![RecommendationBlock::new(
            "💪 Performance Improvement",
            "General recommendations for improving performance",
            vec![
                "Increase your sit-up count gradually".to_string(),
                "Plyometric training to improve your broad jump".to_string(),
                "Combine cardio and strength training".to_string(),
            ],
        )],
    }
}

enum BenchmarkSource {
    Windowed,
    General,
}

fn compare_against(
    profile: &Profile,
    bench: &PerformanceBenchmark,
    source: BenchmarkSource,
) -> Vec<RecommendationBlock> {
    let mut blocks = Vec::new();

    if let Some(avg) = bench.avg_sit_ups {
        if profile.sit_ups < avg {
            let improvement = (avg - profile.sit_ups).max(MIN_SIT_UP_IMPROVEMENT);
            let message = match source {
                BenchmarkSource::Windowed => {
                    format!("Similar successful profiles average {avg} sit-ups")
                }
                BenchmarkSource::General => {
                    format!("The class A/B average is {avg} sit-ups")
                }
            };
            blocks.push(RecommendationBlock::new(
                "💪 Sit-up Improvement",
                message,
                vec![
                    format!("Add {improvement} repetitions to your current performance"),
                    "Core training 3-4x per week with progressive overload".to_string(),
                    "Add variety: planks, bicycle crunches, mountain climbers".to_string(),
                ],
            ));
        }
    }

    if let Some(avg) = bench.avg_broad_jump_cm {
        if profile.broad_jump_cm < avg as f64 {
            let improvement = ((avg as f64 - profile.broad_jump_cm).ceil() as i32)
                .max(MIN_BROAD_JUMP_IMPROVEMENT_CM);
            let message = match source {
                BenchmarkSource::Windowed => {
                    format!("Similar successful profiles reach {avg}cm on average")
                }
                BenchmarkSource::General => {
                    format!("The class A/B average broad jump is {avg}cm")
                }
            };
            blocks.push(RecommendationBlock::new(
                "🦘 Explosive Power Improvement",
                message,
                vec![
                    format!("Improvement target: {improvement}cm over your current distance"),
                    "Plyometric training: jump squats, box jumps, burpees".to_string(),
                    "Leg strengthening: squats, lunges, calf raises".to_string(),
                ],
            ));
        }
    }

    blocks
}

/// Weight block, emitted when the profile deviates more than ±5 kg from
/// the average weight of successful profiles at a similar height.
async fn weight_optimization_block(
    store: &dyn PopulationStore,
    profile: &Profile,
) -> Option<RecommendationBlock> {
    let stats = optimal_weight_statistics(store, profile).await?;
    let weight_diff = (profile.weight_kg - stats.avg_weight_kg as f64).round() as i32;
    if weight_diff.abs() <= WEIGHT_DEVIATION_KG {
        return None;
    }

    let direction_tip = if weight_diff > 0 {
        format!("Consider losing {weight_diff}kg for optimal performance")
    } else {
        format!(
            "Consider gaining {}kg of muscle mass",
            weight_diff.abs()
        )
    };
    let (ideal_min, ideal_max) = scoring::ideal_weight_range(profile.height_cm);

    Some(RecommendationBlock::new(
        "⚖️ Weight Optimization",
        format!(
            "Successful profiles with a similar height average {}kg",
            stats.avg_weight_kg
        ),
        vec![
            direction_tip,
            format!("Healthy weight range for your height: {ideal_min}-{ideal_max}kg"),
            "Consult a nutritionist for a suitable program".to_string(),
            "Combine cardio and strength training".to_string(),
        ],
    ))
}

/// Age-standards block from the ±5-year successful cohort.
async fn age_standards_block(
    store: &dyn PopulationStore,
    profile: &Profile,
) -> Option<RecommendationBlock> {
    let stats = age_group_statistics(store, profile.age).await?;

    let age_tip = if profile.age >= 40 {
        "Focus on flexibility and better recovery".to_string()
    } else {
        "Use your younger years to build a strength foundation".to_string()
    };

    Some(RecommendationBlock::new(
        format!("🎯 Standards for Age {}", profile.age),
        format!(
            "Based on {} successful profiles around your age",
            stats.sample_size
        ),
        vec![
            format!("Sit-up standard for your age: {} repetitions", stats.avg_sit_ups),
            format!("Broad jump standard for your age: {}cm", stats.avg_broad_jump_cm),
            age_tip,
        ],
    ))
}

/// The fallback block guaranteeing a non-empty recommendation list.
fn generic_block() -> RecommendationBlock {
    RecommendationBlock::new(
        "📊 General Recommendation",
        "Based on your profile",
        vec![
            "Do at least 150 minutes of cardio per week".to_string(),
            "Add strength training 2-3 times per week".to_string(),
            "Maintain a balanced diet and adequate rest".to_string(),
        ],
    )
}

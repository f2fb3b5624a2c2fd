//! Print one day's diary and goal progress
//!
//! Usage: daily_report [YYYY-MM-DD]   (defaults to today)

use nutrack::config::database_path_from_env;
use nutrack::models::NutritionValue;
use nutrack::nutrition::NutrientProgress;
use nutrack::tools::diary;

fn macros(n: &NutritionValue) -> String {
    format!(
        "{:>7.0} kcal {:>6.1} P {:>6.1} C {:>6.1} F",
        n.calories, n.protein, n.carbs, n.fat
    )
}

fn progress_line(label: &str, p: &NutrientProgress) -> String {
    let percentage = if p.percentage.is_finite() {
        format!("{:.0}%", p.percentage)
    } else {
        "-".to_string()
    };
    format!(
        "  {:<9} {:>8.1} / {:>8.1}  remaining {:>8.1}  ({})",
        label, p.consumed, p.goal, p.remaining, percentage
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let date = std::env::args()
        .nth(1)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let db_path = database_path_from_env();
    if !db_path.exists() {
        return Err(format!("No database at {}", db_path.display()).into());
    }

    let database = nutrack::db::Database::new(&db_path)?;
    database.with_conn(|conn| nutrack::db::migrations::run_migrations(conn))?;

    let day = diary::get_day(&database, &date)?;

    println!("Diary for {}", day.date);
    if let Some(ref notes) = day.notes {
        println!("Notes: {}", notes);
    }
    println!();

    if day.meals.is_empty() {
        println!("  (nothing logged)");
    }
    for meal in &day.meals {
        println!("{:<24} {}", meal.meal.meal.name, macros(&meal.nutrition.nutrition));
        for item in &meal.meal.items {
            println!("    {:<20} {:>8.1}", item.ingredient_name, item.amount);
        }
    }

    println!();
    println!("{:<24} {}", "Total", macros(&day.daily));

    if let Some(progress) = day.progress {
        println!();
        println!("Goals:");
        println!("{}", progress_line("Calories", &progress.calories));
        println!("{}", progress_line("Protein", &progress.protein));
        println!("{}", progress_line("Carbs", &progress.carbs));
        println!("{}", progress_line("Fat", &progress.fat));
    }

    Ok(())
}

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use coach_core::composer::base_protein_fat;
use coach_core::guard::EaStatus;
use coach_core::intake::{
    entries_for_date, estimated_day_ea, read_entries, reconcile_kcal, remaining, sums_for_date,
};
use coach_core::volume::{read_volume, weekly_report, VOLUME_WINDOW_DAYS};
use coach_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mcoach")]
#[command(about = "Adaptive energy and macro coach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a day's energy and macro targets
    Plan {
        /// Day to plan (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Morning body mass in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Step count
        #[arg(long)]
        steps: Option<u32>,

        /// Activity block as name:minutes:intensity (low, moderate or high), repeatable
        #[arg(long = "activity", value_name = "NAME:MIN:INTENSITY")]
        activities: Vec<ActivityBlock>,

        /// Fatigue, 1 (fresh) to 10 (exhausted)
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=10))]
        fatigue: u8,

        /// Last night's sleep in hours
        #[arg(long, default_value_t = 7.5)]
        sleep: f64,

        /// Recent performance change in percent
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        perf: f64,

        /// Apply carb-bump suggestions
        #[arg(long)]
        apply_suggestions: bool,

        /// Disable trend-based deficit adjustment
        #[arg(long)]
        no_auto: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        /// Compute without saving metrics or targets
        #[arg(long)]
        dry_run: bool,
    },

    /// Record a day's metrics by hand
    Log {
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        steps: Option<u32>,

        /// Exercise minutes
        #[arg(long)]
        exercise_min: Option<f64>,

        #[arg(long)]
        sleep: Option<f64>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        fatigue: Option<u8>,

        #[arg(long, allow_hyphen_values = true)]
        perf: Option<f64>,

        #[arg(long)]
        avg_hr: Option<f64>,

        #[arg(long)]
        max_hr: Option<f64>,

        /// Training load index (MET·min)
        #[arg(long)]
        load: Option<f64>,
    },

    /// Pre-generate day types and base targets
    Schedule {
        /// Pattern: continuous, 5+2 or matador_2+2
        #[arg(long, default_value = "5+2")]
        mode: SchedulePattern,

        /// Number of days to generate
        #[arg(long, default_value_t = 14, value_parser = clap::value_parser!(u16).range(1..=366))]
        days: u16,

        /// First day (default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Print without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Predict tomorrow's training and deficit bands
    Predict {
        #[arg(long)]
        json: bool,
    },

    /// Log a meal and show the day's totals
    Intake {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Meal tag (breakfast, lunch, ...)
        #[arg(long, default_value = "meal")]
        meal: String,

        #[arg(long)]
        kcal: f64,

        #[arg(long, default_value_t = 0.0)]
        protein: f64,

        #[arg(long, default_value_t = 0.0)]
        fat: f64,

        #[arg(long, default_value_t = 0.0)]
        carb: f64,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Undo the most recent intake entry for a day
    UndoIntake {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Track training sets per muscle group
    Volume {
        #[command(subcommand)]
        action: VolumeAction,
    },
}

#[derive(Subcommand)]
enum VolumeAction {
    /// Record sets for a muscle group
    Add {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Muscle group (chest, back, quads, ...)
        #[arg(long)]
        group: String,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        sets: u32,
    },

    /// Sets per muscle group over the last 7 days
    Report {
        /// Last day of the window (default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    coach_core::logging::init_with_level(coach_core::logging::cli_level(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Plan {
            date,
            weight,
            steps,
            activities,
            fatigue,
            sleep,
            perf,
            apply_suggestions,
            no_auto,
            json,
            dry_run,
        } => {
            let opts = PlanOptions {
                date: date.unwrap_or_else(today),
                weight,
                steps,
                activities,
                subjective: SubjectiveInputs {
                    fatigue,
                    sleep_h: sleep,
                    perf_change_pct: perf,
                },
                apply_suggestions,
                no_auto,
                json,
                dry_run,
            };
            cmd_plan(&data_dir, &config, opts)
        }
        Commands::Log {
            date,
            weight,
            steps,
            exercise_min,
            sleep,
            fatigue,
            perf,
            avg_hr,
            max_hr,
            load,
        } => {
            let metrics = DailyMetrics {
                weight_kg: weight,
                steps,
                exercise_min,
                sleep_h: sleep,
                fatigue,
                perf_pct: perf,
                avg_hr,
                max_hr,
                load_index: load,
                ..DailyMetrics::new(date.unwrap_or_else(today))
            };
            cmd_log(&data_dir, metrics)
        }
        Commands::Schedule {
            mode,
            days,
            start,
            dry_run,
        } => cmd_schedule(
            &data_dir,
            &config,
            mode,
            usize::from(days),
            start.unwrap_or_else(today),
            dry_run,
        ),
        Commands::Predict { json } => cmd_predict(&data_dir, json),
        Commands::Intake {
            date,
            meal,
            kcal,
            protein,
            fat,
            carb,
            note,
        } => {
            let entry = IntakeEntry {
                id: uuid::Uuid::new_v4(),
                logged_at: Utc::now(),
                date: date.unwrap_or_else(today),
                meal_tag: meal,
                kcal,
                protein_g: protein,
                fat_g: fat,
                carb_g: carb,
                note,
                reverses: None,
            };
            cmd_intake(&data_dir, &config, entry)
        }
        Commands::UndoIntake { date } => {
            cmd_undo_intake(&data_dir, &config, date.unwrap_or_else(today))
        }
        Commands::Volume { action } => match action {
            VolumeAction::Add { date, group, sets } => {
                let entry = VolumeEntry::new(date.unwrap_or_else(today), &group, sets)?;
                cmd_volume_add(&data_dir, entry)
            }
            VolumeAction::Report { end, json } => {
                cmd_volume_report(&data_dir, end.unwrap_or_else(today), json)
            }
        },
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Catalog with the config's custom activities, validated
fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = get_default_catalog().with_custom(&config.activities.custom)?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation(errors.join("; ")));
    }
    Ok(catalog)
}

struct PlanOptions {
    date: NaiveDate,
    weight: Option<f64>,
    steps: Option<u32>,
    activities: Vec<ActivityBlock>,
    subjective: SubjectiveInputs,
    apply_suggestions: bool,
    no_auto: bool,
    json: bool,
    dry_run: bool,
}

fn cmd_plan(data_dir: &Path, config: &Config, opts: PlanOptions) -> Result<()> {
    let catalog = load_catalog(config)?;
    let mut store = JsonStore::in_dir(data_dir);

    // Only days before the planned one feed the controller, so re-planning a
    // day gives the same answer
    let full_history = store.history()?;
    let history: Vec<DailyMetrics> = full_history
        .iter()
        .filter(|m| m.date < opts.date)
        .cloned()
        .collect();

    let request = PlanRequest {
        activities: opts.activities,
        steps: opts.steps,
        auto_adjust: config.goals.auto_adjust && !opts.no_auto,
        subjective: opts.subjective,
        apply_suggestions: opts.apply_suggestions,
        ..PlanRequest::from_config(config, opts.weight)
    };

    let result = plan_day(&request, &catalog, &history)?;
    let rounded = result.rounded();

    let metrics = DailyMetrics {
        weight_kg: Some(request.profile.with_weight(opts.weight).weight_kg),
        steps: opts.steps,
        exercise_min: Some(request.activities.iter().map(|a| a.minutes).sum()),
        sleep_h: Some(opts.subjective.sleep_h),
        fatigue: Some(opts.subjective.fatigue),
        perf_pct: Some(opts.subjective.perf_change_pct),
        load_index: Some(rounded.load_index),
        ..DailyMetrics::new(opts.date)
    };

    let updated_history = if opts.dry_run {
        let mut h: Vec<DailyMetrics> = full_history
            .into_iter()
            .filter(|m| m.date != opts.date)
            .collect();
        h.push(metrics);
        h
    } else {
        store.upsert_metrics(metrics)?;
        store.upsert_targets(result.to_targets(opts.date))?;
        store.history()?
    };
    let prediction = predict_next_day(&updated_history);
    let ea_status = result.ea_status(&config.guard);

    if opts.json {
        let out = serde_json::json!({
            "date": opts.date,
            "plan": rounded,
            "ea_status": ea_status,
            "prediction": prediction,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        display_plan(opts.date, &rounded, ea_status, config);
        display_prediction(&prediction);
        if opts.dry_run {
            println!("\n[Dry run - nothing saved]");
        } else {
            println!("\n✓ Plan saved for {}", opts.date);
        }
    }

    Ok(())
}

fn cmd_log(data_dir: &Path, metrics: DailyMetrics) -> Result<()> {
    let date = metrics.date;
    let mut store = JsonStore::in_dir(data_dir);
    store.upsert_metrics(metrics)?;
    println!("✓ Metrics saved for {}", date);
    Ok(())
}

fn cmd_schedule(
    data_dir: &Path,
    config: &Config,
    pattern: SchedulePattern,
    days: usize,
    start: NaiveDate,
    dry_run: bool,
) -> Result<()> {
    let profile = config.profile();
    let ffm = metabolic::ffm(profile.weight_kg, profile.body_fat_pct);
    let (protein_g, fat_g) = base_protein_fat(
        &profile,
        ffm,
        config.goals.protein_basis,
        config.goals.protein_per_kg_ffm,
    );

    let generated = schedule(
        &profile,
        start,
        days,
        pattern,
        profile.deficit,
        profile.baseline_pal,
        protein_g,
        fat_g,
    );

    println!("Schedule ({}), {} days from {}", pattern, generated.len(), start);
    for day in &generated {
        println!(
            "  {}  {:<8}  {:>5.0} kcal  P {:.0} / F {:.0} / C {:.0}",
            day.entry.date,
            day.entry.day_type.to_string(),
            day.targets.target_kcal,
            day.targets.protein_g,
            day.targets.fat_g,
            day.targets.carb_g
        );
    }

    if dry_run {
        println!("\n[Dry run - nothing saved]");
        return Ok(());
    }

    let mut store = JsonStore::in_dir(data_dir);
    let count = store.upsert_targets_batch(generated.into_iter().map(|d| d.targets).collect())?;
    println!("\n✓ Saved {} days", count);
    Ok(())
}

fn cmd_predict(data_dir: &Path, json: bool) -> Result<()> {
    let store = JsonStore::in_dir(data_dir);
    let prediction = predict_next_day(&store.history()?);
    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        display_prediction(&prediction);
    }
    Ok(())
}

fn cmd_intake(data_dir: &Path, config: &Config, entry: IntakeEntry) -> Result<()> {
    for (name, value) in [
        ("kcal", entry.kcal),
        ("protein", entry.protein_g),
        ("fat", entry.fat_g),
        ("carb", entry.carb_g),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
    }
    let entry = reconcile_kcal(entry);
    let mut log = JsonlIntakeLog::in_dir(data_dir);
    log.append(&entry)?;

    println!("✓ Logged {} ({:.0} kcal)", entry.meal_tag, entry.kcal);
    if !entry.note.is_empty() {
        println!("  Note: {}", entry.note);
    }
    display_intake_day(data_dir, config, &log, entry.date)
}

fn cmd_undo_intake(data_dir: &Path, config: &Config, date: NaiveDate) -> Result<()> {
    let mut log = JsonlIntakeLog::in_dir(data_dir);
    match log.undo_last(date)? {
        Some(undone) => println!(
            "✓ Undid {} ({:.0} kcal) for {}",
            undone.meal_tag, undone.kcal, date
        ),
        None => println!("Nothing to undo for {}", date),
    }
    display_intake_day(data_dir, config, &log, date)
}

fn display_intake_day(
    data_dir: &Path,
    config: &Config,
    log: &JsonlIntakeLog,
    date: NaiveDate,
) -> Result<()> {
    let entries = read_entries(log.path())?;
    let totals = sums_for_date(&entries, date);
    let store = JsonStore::in_dir(data_dir);
    let target = store.targets_for(date)?;

    println!("\nIntake for {}:", date);
    for e in entries_for_date(&entries, date) {
        println!(
            "  {}  {:<10} {:>5.0} kcal  P {:.0} / F {:.0} / C {:.0}",
            e.logged_at.with_timezone(&Local).format("%H:%M"),
            e.meal_tag,
            e.kcal,
            e.protein_g,
            e.fat_g,
            e.carb_g
        );
    }
    match target {
        Some(t) => {
            let left = remaining(
                IntakeTotals {
                    kcal: t.target_kcal,
                    protein_g: t.protein_g,
                    fat_g: t.fat_g,
                    carb_g: t.carb_g,
                },
                totals,
            );
            println!(
                "  Total {:.0} / {:.0} kcal ({:.0} remaining)",
                totals.kcal, t.target_kcal, left.kcal
            );
            println!(
                "  Protein {:.0}/{:.0} g  Fat {:.0}/{:.0} g  Carb {:.0}/{:.0} g",
                totals.protein_g, t.protein_g, totals.fat_g, t.fat_g, totals.carb_g, t.carb_g
            );
            println!(
                "  Remaining: P {:.0} g / F {:.0} g / C {:.0} g",
                left.protein_g, left.fat_g, left.carb_g
            );
        }
        None => {
            println!("  Total {:.0} kcal (no target planned for this day)", totals.kcal);
        }
    }

    // EA estimate needs the day's logged load
    let day_metrics = store.history()?.into_iter().find(|m| m.date == date);
    match day_metrics.as_ref().and_then(|m| m.load_index.map(|load| (m, load))) {
        Some((m, load)) => {
            let profile = config.profile().with_weight(m.weight_kg);
            let ffm = metabolic::ffm(profile.weight_kg, profile.body_fat_pct);
            let ea = estimated_day_ea(totals.kcal, load, profile.weight_kg, ffm);
            println!(
                "  EA estimate {:.1} kcal/kg FFM (from load {:.0})",
                ea, load
            );
        }
        None => println!("  No load logged for this day, EA estimate unavailable"),
    }
    Ok(())
}

fn cmd_volume_add(data_dir: &Path, entry: VolumeEntry) -> Result<()> {
    let mut log = JsonlVolumeLog::in_dir(data_dir);
    log.append(&entry)?;
    println!(
        "✓ Logged {} sets of {} for {}",
        entry.sets, entry.muscle_group, entry.date
    );
    Ok(())
}

fn cmd_volume_report(data_dir: &Path, end: NaiveDate, json: bool) -> Result<()> {
    let log = JsonlVolumeLog::in_dir(data_dir);
    let report = weekly_report(&read_volume(log.path())?, end);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Sets per muscle group, {} days to {}:", VOLUME_WINDOW_DAYS, end);
    if report.is_empty() {
        println!("  (no volume logged)");
    }
    for group in &report {
        println!("  {:<12} {:>3}  {}", group.muscle_group, group.sets, group.advice);
    }
    Ok(())
}

fn display_plan(date: NaiveDate, plan: &PlanResult, ea_status: EaStatus, config: &Config) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  PLAN FOR {}", date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Target: {:.0} kcal", plan.target_kcal);
    println!(
        "  Protein {:.0} g | Fat {:.0} g | Carb {:.0} g",
        plan.protein_g, plan.fat_g, plan.carb_g
    );
    println!();
    println!("  BMR {:.1} | PAL {:.2}", plan.bmr, plan.pal);
    println!(
        "  Exercise {:.0} kcal | Load {:.0}",
        plan.exercise_kcal, plan.load_index
    );
    println!("  TDEE {:.0} | Deficit {:.3}", plan.tdee, plan.deficit);
    println!(
        "  Intended {:.0} kcal | EA floor {:.0} kcal",
        plan.intended_kcal, plan.ea_floor_kcal
    );
    println!();
    let status = match ea_status {
        EaStatus::BelowMinimum => format!("below {:.0}", config.guard.ea_min),
        EaStatus::BelowPreferred => format!("below preferred {:.0}", config.guard.ea_pref),
        EaStatus::Adequate => "ok".to_string(),
    };
    println!("  FFM {:.1} kg | EA {:.1} kcal/kg FFM ({})", plan.ffm, plan.ea, status);
    if plan.ea_guard_applied {
        println!("  ⚠ EA guard raised intake");
    }
    println!(
        "  Training day: {}",
        if plan.is_training_day { "yes" } else { "no" }
    );
    if let (Some(observed), Some(target)) = (plan.weekly_loss_pct, plan.target_loss_pct) {
        println!(
            "  Weekly loss: {:.2}% of body mass (target {:.2}%)",
            observed, target
        );
    }

    if !plan.notes.is_empty() {
        println!("\nNotes:");
        for note in &plan.notes {
            println!("  - {}", note);
        }
    }

    println!("\nSuggestions:");
    if plan.suggestions.is_empty() {
        println!("  (none)");
    } else {
        for s in &plan.suggestions {
            println!("  - {}", s);
        }
    }
}

fn display_prediction(prediction: &Prediction) {
    println!("\nTomorrow:");
    println!(
        "  Training: {} | Deficit: {}",
        prediction.train_band, prediction.deficit_band
    );
    println!("  {}", prediction.note());
}

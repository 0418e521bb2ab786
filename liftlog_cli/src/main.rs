use chrono::Utc;
use clap::{Parser, Subcommand};
use liftlog_core::formulas::{lb_to_kg, macro_split, wilks_score, ActivityLevel, Goal};
use liftlog_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Workout analytics and personal record tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user (defaults to the only registered user)
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user
    Init {
        name: String,

        /// male or female (used by the Wilks and macro formulas)
        #[arg(long)]
        gender: String,
    },

    /// Register an exercise
    Exercise {
        name: String,

        /// Muscle group (chest, back, legs, ...)
        #[arg(long, default_value = "other")]
        category: String,
    },

    /// Start a workout session
    Start {
        name: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Log a set in the open workout
    Set {
        exercise: String,
        weight: f64,
        reps: u32,

        /// Warmup sets never count toward volume or records
        #[arg(long)]
        warmup: bool,
    },

    /// Finish the open workout
    Finish,

    /// Log a body measurement
    Measure {
        /// Body weight in kg
        weight: f64,

        #[arg(long)]
        body_fat: Option<f64>,
    },

    /// Show the dashboard and aggregate stats
    Stats {
        /// Day window for the time-windowed aggregates
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// List personal records
    Records,

    /// List achievements, unlocked and locked
    Achievements,

    /// Show the workout streak
    Streak,

    /// Compute a daily macro split
    Macros {
        #[arg(long)]
        age: u32,

        #[arg(long)]
        height_cm: f64,

        /// Body weight in kg
        #[arg(long)]
        weight_kg: f64,

        /// sedentary, light, moderate, very, extra
        #[arg(long, default_value = "moderate")]
        activity: String,

        /// cut, maintain, bulk
        #[arg(long, default_value = "maintain")]
        goal: String,
    },

    /// Compute a Wilks score
    Wilks {
        /// Body weight
        #[arg(long)]
        bodyweight: f64,

        /// Total lifted
        #[arg(long)]
        total: f64,

        /// Treat inputs as pounds instead of kilograms
        #[arg(long)]
        lb: bool,
    },

    /// Export workout history to CSV
    Export { path: PathBuf },

    /// Re-run achievement evaluation
    Sync,
}

fn main() -> Result<()> {
    liftlog_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let store_path = data_dir.join("liftlog.json");

    let store = Store::load(&store_path)?;
    let mut app = App {
        engine: Engine::new(store, RecordingNotifier::default(), config),
        store_path,
        user_name: cli.user,
    };

    match cli.command {
        Commands::Init { name, gender } => app.init(&name, &gender),
        Commands::Exercise { name, category } => app.add_exercise(&name, &category),
        Commands::Start { name, notes } => app.start(&name, notes),
        Commands::Set {
            exercise,
            weight,
            reps,
            warmup,
        } => app.log_set(&exercise, weight, reps, warmup),
        Commands::Finish => app.finish(),
        Commands::Measure { weight, body_fat } => app.measure(weight, body_fat),
        Commands::Stats { days } => app.stats(days),
        Commands::Records => app.records(),
        Commands::Achievements => app.achievements(),
        Commands::Streak => app.streak(),
        Commands::Macros {
            age,
            height_cm,
            weight_kg,
            activity,
            goal,
        } => app.macros(age, height_cm, weight_kg, &activity, &goal),
        Commands::Wilks {
            bodyweight,
            total,
            lb,
        } => app.wilks(bodyweight, total, lb),
        Commands::Export { path } => app.export(&path),
        Commands::Sync => app.sync(),
    }
}

struct App {
    engine: Engine<RecordingNotifier>,
    store_path: PathBuf,
    user_name: Option<String>,
}

impl App {
    /// Resolve the acting user: `--user` by name, or the only registered
    /// user when unambiguous
    fn user_id(&self) -> Result<Uuid> {
        let users = &self.engine.store().users;

        if let Some(name) = &self.user_name {
            return users
                .values()
                .find(|u| u.name.eq_ignore_ascii_case(name))
                .map(|u| u.id)
                .ok_or_else(|| Error::Other(format!("unknown user '{}'", name)));
        }

        match users.len() {
            0 => Err(Error::Other(
                "no user registered; run 'liftlog init <name> --gender <male|female>'".into(),
            )),
            1 => Ok(*users.keys().next().expect("len checked")),
            _ => Err(Error::Other(
                "multiple users registered; pick one with --user".into(),
            )),
        }
    }

    fn exercise_id(&self, name: &str) -> Result<Uuid> {
        self.engine
            .store()
            .exercises
            .values()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.id)
            .ok_or_else(|| {
                Error::Other(format!(
                    "unknown exercise '{}'; run 'liftlog exercise \"{}\"' first",
                    name, name
                ))
            })
    }

    /// The user's workout still missing an end time, if any
    fn open_workout_id(&self, user_id: Uuid) -> Option<Uuid> {
        self.engine
            .store()
            .workouts_for(user_id)
            .filter(|w| w.ended_at.is_none())
            .last()
            .map(|w| w.id)
    }

    fn save(&self) -> Result<()> {
        self.engine.store().save(&self.store_path)
    }

    /// Print every notification the run produced
    fn report_notices(&self) {
        let notifier = self.engine.notifier();
        for notice in &notifier.personal_records {
            println!(
                "★ New {} record: {}{}",
                notice.kind,
                notice.value,
                notice
                    .secondary_value
                    .map(|s| format!(" ({})", s))
                    .unwrap_or_default()
            );
        }
        for (notice, _) in &notifier.achievements {
            println!("{} {}", notice.icon, notice.message);
        }
    }

    fn init(&mut self, name: &str, gender: &str) -> Result<()> {
        let gender = parse_gender(gender)?;

        let store = self.engine.store_mut();
        if store
            .users
            .values()
            .any(|u| u.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::Other(format!("user '{}' already exists", name)));
        }

        let user = User::new(name, gender);
        println!("✓ Registered user {} ({})", user.name, user.id);
        store.users.insert(user.id, user);
        self.save()
    }

    fn add_exercise(&mut self, name: &str, category: &str) -> Result<()> {
        let store = self.engine.store_mut();
        if store
            .exercises
            .values()
            .any(|e| e.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::Other(format!("exercise '{}' already exists", name)));
        }

        let exercise = Exercise::new(name, category);
        println!("✓ Registered exercise {} [{}]", exercise.name, exercise.category);
        store.exercises.insert(exercise.id, exercise);
        self.save()
    }

    fn start(&mut self, name: &str, notes: Option<String>) -> Result<()> {
        let user_id = self.user_id()?;
        let now = Utc::now();

        if self.open_workout_id(user_id).is_some() {
            return Err(Error::Other(
                "a workout is already open; run 'liftlog finish' first".into(),
            ));
        }

        let mut workout = Workout::new(user_id, name, now);
        workout.notes = notes;
        let workout_id = workout.id;
        self.engine.store_mut().workouts.push(workout);

        self.engine.handle(
            DomainEvent::WorkoutSaved {
                workout_id,
                diff: WorkoutDiff {
                    started_at: true,
                    name: true,
                    notes: true,
                    ..WorkoutDiff::default()
                },
            },
            now,
        )?;
        self.engine.run_pending_jobs(now)?;

        println!("✓ Started workout '{}'", name);
        self.report_notices();
        self.save()
    }

    fn log_set(&mut self, exercise: &str, weight: f64, reps: u32, warmup: bool) -> Result<()> {
        let user_id = self.user_id()?;
        let exercise_id = self.exercise_id(exercise)?;
        let workout_id = self
            .open_workout_id(user_id)
            .ok_or_else(|| Error::Other("no open workout; run 'liftlog start' first".into()))?;
        let now = Utc::now();

        let workout = self.engine.store_mut().workout_mut(workout_id)?;
        let line_idx = match workout.lines.iter().position(|l| l.exercise_id == exercise_id) {
            Some(idx) => idx,
            None => {
                workout.lines.push(WorkoutLine::new(exercise_id));
                workout.lines.len() - 1
            }
        };
        let line = &mut workout.lines[line_idx];

        let order = line.sets.len() as u32;
        let mut set = SetEntry::new(weight, reps, order);
        set.is_warmup = warmup;
        let set_id = set.id;
        line.sets.push(set);

        self.engine.handle(
            DomainEvent::SetSaved {
                workout_id,
                set_id,
                user_override: None,
            },
            now,
        )?;
        let granted = self.engine.run_pending_jobs(now)?;

        println!(
            "✓ Logged {} {}x{}{}",
            exercise,
            weight,
            reps,
            if warmup { " (warmup)" } else { "" }
        );
        self.report_notices();
        tracing::debug!("{} achievements granted this run", granted.len());
        self.save()
    }

    fn finish(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let workout_id = self
            .open_workout_id(user_id)
            .ok_or_else(|| Error::Other("no open workout".into()))?;
        let now = Utc::now();

        let workout = self.engine.store_mut().workout_mut(workout_id)?;
        workout.ended_at = Some(now);
        let name = workout.name.clone();
        let volume = workout.volume();
        let minutes = workout.duration_minutes().unwrap_or(0);

        self.engine.handle(
            DomainEvent::WorkoutSaved {
                workout_id,
                diff: WorkoutDiff {
                    ended_at: true,
                    ..WorkoutDiff::default()
                },
            },
            now,
        )?;
        self.engine.run_pending_jobs(now)?;

        println!("✓ Finished '{}': {} volume in {} min", name, volume, minutes);
        self.report_notices();
        self.save()
    }

    fn measure(&mut self, weight: f64, body_fat: Option<f64>) -> Result<()> {
        let user_id = self.user_id()?;
        let now = Utc::now();

        let mut measurement = BodyMeasurement::new(user_id, weight, now);
        measurement.body_fat = body_fat;
        self.engine.store_mut().measurements.push(measurement);

        self.engine
            .handle(DomainEvent::MeasurementSaved { user_id }, now)?;

        println!("✓ Logged {} kg", weight);
        self.save()
    }

    fn stats(&mut self, days: u32) -> Result<()> {
        let user_id = self.user_id()?;
        let now = Utc::now();

        let mut stats = self.engine.stats();
        let dashboard = stats.dashboard(user_id, now)?;
        let monthly = stats.monthly_volume_comparison(user_id, now)?;
        let distribution = stats.duration_distribution(user_id, days, now)?;
        let muscles = stats.muscle_distribution(user_id, days, now)?;

        println!("Workouts: {} total, {} this week", dashboard.workouts_count, dashboard.this_week_count);
        if let Some(weight) = dashboard.latest_weight {
            println!("Latest weight: {} kg", weight);
        }

        println!();
        println!(
            "This week: {} (prev {}, {:+}%)",
            dashboard.weekly.current_week_volume,
            dashboard.weekly.previous_week_volume,
            dashboard.weekly.percentage
        );
        println!(
            "This month: {} (prev {}, {:+}%)",
            monthly.current_month_volume, monthly.previous_month_volume, monthly.percentage
        );

        if !dashboard.recent_workouts.is_empty() {
            println!();
            println!("Recent workouts:");
            for workout in &dashboard.recent_workouts {
                println!(
                    "  {}  {} ({} volume)",
                    workout.started_at.format("%Y-%m-%d"),
                    workout.name,
                    workout.volume
                );
            }
        }

        println!();
        println!("Durations (last {} days):", days);
        for bucket in &distribution {
            println!("  {:<10} {}", bucket.label, bucket.count);
        }

        if !muscles.is_empty() {
            println!();
            println!("Volume by muscle group (last {} days):", days);
            for entry in &muscles {
                println!("  {:<10} {}", entry.category, entry.volume);
            }
        }

        Ok(())
    }

    fn records(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let store = self.engine.store();

        let mut records: Vec<_> = store.records_for(user_id).collect();
        if records.is_empty() {
            println!("No personal records yet.");
            return Ok(());
        }
        records.sort_by(|a, b| {
            a.exercise_id
                .cmp(&b.exercise_id)
                .then(a.kind.as_str().cmp(b.kind.as_str()))
        });

        for record in records {
            let exercise = store
                .exercises
                .get(&record.exercise_id)
                .map(|e| e.name.as_str())
                .unwrap_or("unknown");
            println!(
                "{:<20} {:<15} {}{}  ({})",
                exercise,
                record.kind.as_str(),
                record.value,
                record
                    .secondary_value
                    .map(|s| format!(" ({})", s))
                    .unwrap_or_default(),
                record.achieved_at.format("%Y-%m-%d")
            );
        }
        Ok(())
    }

    fn achievements(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let store = self.engine.store();

        for def in achievement_catalog() {
            let unlocked = store
                .user_achievements
                .iter()
                .find(|a| a.user_id == user_id && a.slug == def.slug);
            match unlocked {
                Some(grant) => println!(
                    "{} {:<20} unlocked {}",
                    def.icon,
                    def.name,
                    grant.achieved_at.format("%Y-%m-%d")
                ),
                None => println!("  {:<20} locked", def.name),
            }
        }
        Ok(())
    }

    fn streak(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let now = Utc::now();
        let user = self.engine.store().user(user_id)?;

        println!("Current streak: {} days", effective_current_streak(user, now));
        println!("Longest streak: {} days", user.streak.longest_streak());
        if let Some(last) = user.streak.last_workout_at() {
            println!("Last workout:   {}", last.format("%Y-%m-%d %H:%M"));
        }
        Ok(())
    }

    fn macros(
        &mut self,
        age: u32,
        height_cm: f64,
        weight_kg: f64,
        activity: &str,
        goal: &str,
    ) -> Result<()> {
        let user_id = self.user_id()?;
        let gender = self.engine.store().user(user_id)?.gender;

        let activity = ActivityLevel::parse(activity)
            .ok_or_else(|| Error::Other(format!("unknown activity level '{}'", activity)))?;
        let goal = parse_goal(goal)?;

        let targets = macro_split(gender, age, height_cm, weight_kg, activity, goal);

        println!("BMR:      {:.0} kcal", targets.bmr);
        println!("TDEE:     {:.0} kcal", targets.tdee);
        println!("Target:   {:.0} kcal", targets.target_calories);
        println!("Protein:  {:.0} g", targets.protein_g);
        println!("Fat:      {:.0} g", targets.fat_g);
        println!("Carbs:    {:.0} g", targets.carbs_g);
        Ok(())
    }

    fn wilks(&mut self, bodyweight: f64, total: f64, lb: bool) -> Result<()> {
        let user_id = self.user_id()?;
        let gender = self.engine.store().user(user_id)?.gender;

        let (bw_kg, total_kg) = if lb {
            (lb_to_kg(bodyweight), lb_to_kg(total))
        } else {
            (bodyweight, total)
        };

        println!("Wilks score: {}", wilks_score(bw_kg, total_kg, gender));
        Ok(())
    }

    fn export(&mut self, path: &PathBuf) -> Result<()> {
        let user_id = self.user_id()?;
        let rows = export_workout_history(self.engine.store(), user_id, path)?;
        println!("✓ Exported {} set rows to {}", rows, path.display());
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let now = Utc::now();

        self.engine
            .handle(DomainEvent::SyncRequested { user_id }, now)?;
        let granted = self.engine.run_pending_jobs(now)?;

        if granted.is_empty() {
            println!("Nothing new to grant.");
        } else {
            self.report_notices();
        }
        self.save()
    }
}

fn parse_gender(s: &str) -> Result<Gender> {
    match s.to_lowercase().as_str() {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        _ => Err(Error::Other(format!(
            "unknown gender '{}' (expected male or female)",
            s
        ))),
    }
}

fn parse_goal(s: &str) -> Result<Goal> {
    match s.to_lowercase().as_str() {
        "cut" => Ok(Goal::Cut),
        "maintain" => Ok(Goal::Maintain),
        "bulk" => Ok(Goal::Bulk),
        _ => Err(Error::Other(format!(
            "unknown goal '{}' (expected cut, maintain or bulk)",
            s
        ))),
    }
}

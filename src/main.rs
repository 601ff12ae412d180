use jvm_splice::jvm::code::listing::{parse_classes, render_class};
use jvm_splice::jvm::model::ClassPool;
use jvm_splice::splice::{
    ClassTransformer, Error, ProcessorDescriptor, ProcessorRegistry, Settings, SpliceDescriptor,
    SpliceOutcome, SpliceProcessor, SpliceRegistry, TransformOutcome, ValidationError,
};

use clap::{Arg, ArgAction, Command};
use std::fs;

/// Logs what the registry holds every time it gets (re)loaded
struct LogStatistics;

impl LogStatistics {
    const ID: &'static str = "log-statistics";
}

impl SpliceProcessor for LogStatistics {
    fn id(&self) -> &str {
        LogStatistics::ID
    }

    fn on_init(&mut self, registry: &SpliceRegistry) {
        let stats = registry.statistics();
        log::info!(
            "{} splices into {} methods of {} classes",
            stats.total,
            stats.injection_points,
            stats.classes
        );
        for (kind, count) in &stats.by_kind {
            log::info!("  {:<8} {}", kind, count);
        }
    }
}

/// Parse `KIND:PRIORITY:TARGET_METHOD:SOURCE_METHOD`, filling in empty fields from the settings
fn parse_inject(settings: &Settings, text: &str) -> Result<SpliceDescriptor, ValidationError> {
    let fields: Vec<&str> = text.splitn(4, ':').collect();
    if fields.len() != 4 {
        return Err(ValidationError::MalformedDescriptor(format!(
            "expected KIND:PRIORITY:TARGET:SOURCE, got '{}'",
            text
        )));
    }
    let kind = if fields[0].trim().is_empty() {
        settings.default_kind.name()
    } else {
        fields[0]
    };
    let priority = if fields[1].trim().is_empty() {
        settings.default_priority
    } else {
        fields[1].trim().parse::<i32>().map_err(|err| {
            ValidationError::MalformedDescriptor(format!("priority '{}': {}", fields[1], err))
        })?
    };
    SpliceDescriptor::parse(fields[2], fields[3], kind, priority)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("JVM method splicer")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Splice static mixin methods into the methods of target classes")
        .arg(
            Arg::new("mixin")
                .long("mixin")
                .value_name("FILE")
                .action(ArgAction::Append)
                .help("Listing of classes holding source methods (may be repeated)"),
        )
        .arg(
            Arg::new("inject")
                .long("inject")
                .value_name("KIND:PRIORITY:TARGET:SOURCE")
                .action(ArgAction::Append)
                .help("Splice to perform, eg. `BEFORE:10:demo/A.run()V:demo/M.hook()V` (may be repeated)"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("PREFIX")
                .action(ArgAction::Append)
                .help("Never transform classes starting with this prefix (eg. `demo/internal/`)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write the transformed listing here instead of to stdout"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Sets the listing of target classes to use")
                .required(true)
                .index(1),
        )
        .get_matches();

    let mut settings = Settings::default();
    for prefix in matches.get_many::<String>("exclude").into_iter().flatten() {
        settings.add_excluded_prefix(prefix.as_str());
    }

    let input = matches
        .get_one::<String>("INPUT")
        .ok_or("missing input listing")?;
    log::info!("Reading targets from '{}'", input);
    let targets = parse_classes(&fs::read_to_string(input)?)?;
    // Targets are also fair game as sources
    let mut pool = ClassPool::new();
    pool.extend(targets.iter().cloned());
    for mixin in matches.get_many::<String>("mixin").into_iter().flatten() {
        log::info!("Reading mixins from '{}'", mixin);
        pool.extend(parse_classes(&fs::read_to_string(mixin)?)?);
    }

    let mut descriptors = vec![];
    for inject in matches.get_many::<String>("inject").into_iter().flatten() {
        descriptors.push(parse_inject(&settings, inject).map_err(Error::from)?);
    }
    let registry = SpliceRegistry::new(descriptors);

    let mut processors = ProcessorRegistry::new();
    processors.register(LogStatistics::ID, || {
        Box::new(LogStatistics) as Box<dyn SpliceProcessor>
    });
    let mut processors = processors
        .instantiate(&[ProcessorDescriptor {
            id: String::from(LogStatistics::ID),
            priority: 0,
        }])
        .map_err(Error::from)?;
    processors.init(&registry);

    let transformer = ClassTransformer::new(settings);
    let mut rendered = vec![];
    for class in &targets {
        match transformer.transform_class(class, &registry, &pool) {
            TransformOutcome::Transformed { class, report } => {
                for (descriptor, outcome) in &report.entries {
                    match outcome {
                        SpliceOutcome::Applied => log::info!("Applied {}", descriptor),
                        SpliceOutcome::Discarded => log::info!("Discarded {}", descriptor),
                        SpliceOutcome::Failed(err) => {
                            log::error!("Failed {}: {}", descriptor, err)
                        }
                        SpliceOutcome::RolledBack => log::error!("Rolled back {}", descriptor),
                    }
                }
                rendered.push(render_class(&class));
            }
            TransformOutcome::Excluded | TransformOutcome::Unaffected => {
                rendered.push(render_class(class))
            }
        }
    }

    let listing = rendered.join("\n");
    match matches.get_one::<String>("output") {
        Some(output) => {
            log::info!("Writing '{}'", output);
            fs::write(output, listing)?;
        }
        None => print!("{}", listing),
    }

    Ok(())
}

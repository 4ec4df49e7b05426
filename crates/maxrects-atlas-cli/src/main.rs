use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use image::{ImageReader, RgbaImage};
use maxrects_atlas_core::{
    AtlasRegistry, DEFAULT_PACKING_TAG, DynamicAtlasConfig, GrowthPolicy, Heuristic, SpriteImage, SpriteInput,
    StaticAtlasConfig, build_static_atlas, layout_to_json, layout_to_json_hash,
    pack_static_layout,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "maxrects-atlas",
    about = "Pack sprites into power-of-two texture atlases with MaxRects",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a folder of images into name.png + name.json
    Pack(PackArgs),
    /// Layout-only: pack a list of sizes (YAML/JSON) and print or write the JSON layout
    Layout(LayoutArgs),
    /// Compare heuristics on the same input (occupancy + time)
    Bench(BenchArgs),
    /// Feed images one by one into a growing runtime atlas and report every growth
    Grow(GrowArgs),
}

#[derive(Parser, Debug, Clone)]
struct AtlasArgs {
    /// YAML config file (StaticAtlasConfig fields); command-line flags override it
    #[arg(long, help_heading = "Layout")]
    config: Option<PathBuf>,
    /// Free-rectangle heuristic: baf|bssf|blsf|bl|cp
    #[arg(long, help_heading = "Layout")]
    heuristic: Option<String>,
    /// Allow 90° rotation
    #[arg(long, help_heading = "Layout")]
    allow_flip: Option<bool>,
    /// First atlas size tried
    #[arg(long, help_heading = "Layout")]
    min_size: Option<u32>,
    /// Largest atlas size (e.g. 2048 or 2048x2048)
    #[arg(long, help_heading = "Layout")]
    max_size: Option<String>,
    /// Pixels reserved right of and below each sprite
    #[arg(long, help_heading = "Layout")]
    spacing: Option<u32>,
    /// Edge pixels duplicated around each sprite
    #[arg(long, help_heading = "Layout")]
    edge_padding: Option<u32>,
    /// Place by global best score instead of input order
    #[arg(long, help_heading = "Layout")]
    greedy: Option<bool>,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.png/.json)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    #[command(flatten)]
    atlas: AtlasArgs,
    /// Write box-filtered mip levels as name_mipN.png
    #[arg(long, help_heading = "Export")]
    mips: Option<bool>,
    /// Metadata format: json | json-hash
    #[arg(long, default_value = "json", value_parser = ["json", "json-hash"], help_heading = "Export")]
    metadata: String,
    /// Print the merged configuration (after YAML/flags) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    /// Sizes file: a YAML or JSON list of `{ key, w, h, edge_padding? }`
    sizes: PathBuf,
    /// Write the layout here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    atlas: AtlasArgs,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Sizes file (YAML/JSON) or image directory
    input: PathBuf,
    /// Repetitions per heuristic
    #[arg(long, default_value_t = 5)]
    runs: u32,
    #[command(flatten)]
    atlas: AtlasArgs,
}

#[derive(Parser, Debug, Clone)]
struct GrowArgs {
    /// Input file or directory (images are inserted in sorted path order; each
    /// subdirectory gets its own atlas, loose files go to the default one)
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,
    /// Texture base name
    #[arg(short, long, default_value = "runtime")]
    name: String,
    /// Starting texture size (256..8192)
    #[arg(long, default_value = "256")]
    initial_size: String,
    /// Largest texture size
    #[arg(long, default_value = "8192")]
    max_size: String,
    /// Padding on every side of each entry
    #[arg(long, default_value_t = 2)]
    padding: u32,
    /// Free-rectangle heuristic: baf|bssf|blsf|bl|cp
    #[arg(long, default_value = "baf")]
    heuristic: String,
    /// Grow by packing fixed square cells of this size instead of expanding in place
    #[arg(long)]
    cell_size: Option<u32>,
    /// Compute placements only; do not write the texture
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    heuristic: Option<String>,
    allow_flip: Option<bool>,
    min_size: Option<u32>,
    max_size: Option<u32>,
    space_between_sprites: Option<u32>,
    edge_pixel_padding: Option<u32>,
    generate_mips: Option<bool>,
    greedy_batch: Option<bool>,
}

impl YamlConfig {
    fn into_static_config(
        self,
        mut cfg: StaticAtlasConfig,
    ) -> anyhow::Result<StaticAtlasConfig> {
        if let Some(v) = self.heuristic {
            cfg.heuristic = parse_heuristic(&v)?;
        }
        if let Some(v) = self.allow_flip {
            cfg.allow_flip = v;
        }
        if let Some(v) = self.min_size {
            cfg.min_size = v;
        }
        if let Some(v) = self.max_size {
            cfg.max_size = v;
        }
        if let Some(v) = self.space_between_sprites {
            cfg.space_between_sprites = v;
        }
        if let Some(v) = self.edge_pixel_padding {
            cfg.edge_pixel_padding = v;
        }
        if let Some(v) = self.generate_mips {
            cfg.generate_mips = v;
        }
        if let Some(v) = self.greedy_batch {
            cfg.greedy_batch = v;
        }
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pack(args) => run_pack(args, show_progress),
        Commands::Layout(args) => run_layout(args),
        Commands::Bench(args) => run_bench(args),
        Commands::Grow(args) => run_grow(args, show_progress),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = build_static_config(&cli.atlas)?;
    if let Some(v) = cli.mips {
        cfg.generate_mips = v;
    }

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    let sprites = load_images_with_progress(&paths, show_progress)?;
    if sprites.is_empty() {
        anyhow::bail!("no images found under {}", cli.input.display());
    }
    info!(count = sprites.len(), "loaded input images");

    let start = Instant::now();
    let atlas = build_static_atlas(&sprites, &cfg).context("build atlas")?;
    let layout = &atlas.layout;
    info!(
        size = layout.size,
        occupancy = format!("{:.2}%", layout.occupancy * 100.0),
        content = format!("{:.2}%", layout.content_occupancy() * 100.0),
        time = fmt_dur(start.elapsed()),
        "packed"
    );

    if cli.dry_run {
        println!(
            "size={} sprites={} occupancy={:.2}%",
            layout.size,
            layout.placements.len(),
            layout.occupancy * 100.0
        );
        return Ok(());
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    let png_path = cli.out_dir.join(format!("{}.png", cli.name));
    atlas
        .texture
        .save(&png_path)
        .with_context(|| format!("write {}", png_path.display()))?;
    for (i, level) in atlas.mips.iter().enumerate() {
        let mip_path = cli.out_dir.join(format!("{}_mip{}.png", cli.name, i + 1));
        level
            .save(&mip_path)
            .with_context(|| format!("write {}", mip_path.display()))?;
    }

    let json_value = match cli.metadata.as_str() {
        "json-hash" => layout_to_json_hash(layout),
        _ => layout_to_json(layout),
    };
    let json_path = cli.out_dir.join(format!("{}.json", cli.name));
    fs::write(&json_path, serde_json::to_string_pretty(&json_value)?)
        .with_context(|| format!("write {}", json_path.display()))?;
    info!(?png_path, ?json_path, mips = atlas.mips.len(), "atlas written");
    Ok(())
}

fn run_layout(cli: &LayoutArgs) -> anyhow::Result<()> {
    let cfg = build_static_config(&cli.atlas)?;
    let sprites = read_sizes(&cli.sizes)?;
    let layout = pack_static_layout(&sprites, &cfg).context("pack layout")?;
    info!(
        size = layout.size,
        occupancy = format!("{:.2}%", layout.occupancy * 100.0),
        "layout computed"
    );
    let json = serde_json::to_string_pretty(&layout_to_json(&layout))?;
    match &cli.out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(?path, "layout written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    let base = build_static_config(&b.atlas)?;
    let sprites = if b.input.is_dir() {
        let paths = gather_paths(&b.input, &[], &[])?;
        load_images_with_progress(&paths, false)?
            .into_iter()
            .map(|s| {
                let (w, h) = s.image.dimensions();
                SpriteInput::new(s.key, w, h).with_edge_padding(s.edge_padding)
            })
            .collect()
    } else {
        read_sizes(&b.input)?
    };
    let runs = b.runs.max(1);
    println!("{:<6} {:>6} {:>10} {:>10}", "heur", "size", "occupancy", "time");
    for heuristic in Heuristic::ALL {
        let cfg = StaticAtlasConfig {
            heuristic,
            ..base.clone()
        };
        let start = Instant::now();
        let mut last = None;
        for _ in 0..runs {
            last = Some(pack_static_layout(&sprites, &cfg));
        }
        let per_run = start.elapsed() / runs;
        match last {
            Some(Ok(layout)) => println!(
                "{:<6} {:>6} {:>9.2}% {:>10}",
                heuristic.short_name(),
                layout.size,
                layout.occupancy * 100.0,
                fmt_dur(per_run)
            ),
            Some(Err(e)) => println!("{:<6} failed: {}", heuristic.short_name(), e),
            None => {}
        }
    }
    Ok(())
}

fn run_grow(cli: &GrowArgs, show_progress: bool) -> anyhow::Result<()> {
    let initial_size = parse_atlas_size(&cli.initial_size)?;
    let max_size = parse_atlas_size(&cli.max_size)?;
    let heuristic = parse_heuristic(&cli.heuristic)?;
    let growth = match cli.cell_size {
        Some(cell_size) => GrowthPolicy::Cells { cell_size },
        None => GrowthPolicy::Expand,
    };
    let cfg = DynamicAtlasConfig::builder()
        .initial_size(initial_size)
        .max_size(max_size)
        .warning_size(max_size.min(4096))
        .padding(cli.padding)
        .heuristic(heuristic)
        .growth(growth)
        .build();

    let mut paths = gather_paths(&cli.input, &[], &[])?;
    paths.sort();
    let sprites = load_images_with_progress(&paths, show_progress)?;
    let mut registry: AtlasRegistry = AtlasRegistry::with_default_tag(cfg)?;
    if !cli.dry_run {
        registry = registry.with_pixels();
    }

    for s in &sprites {
        let tag = packing_tag(&cli.input, &s.key);
        let atlas = registry.find_or_add(tag.clone())?;
        let (insertion, region) = if cli.dry_run {
            let (w, h) = s.image.dimensions();
            (atlas.insert(s.key.clone(), w, h)?, Default::default())
        } else {
            atlas.insert_image(s.key.clone(), &s.image)?
        };
        for g in &insertion.growth {
            println!(
                "[{}] grow {}->{} (uv scale {}) before {}",
                tag,
                g.old_size,
                g.new_size,
                g.uv_scale(),
                s.key
            );
        }
        info!(%tag, key = %s.key, rect = ?insertion.rect, ?region, "inserted");
    }

    let mut tags: Vec<&String> = registry.tags().collect();
    tags.sort();
    for tag in tags {
        let Some(atlas) = registry.get(tag) else {
            continue;
        };
        println!(
            "[{}] entries={} size={} occupancy={:.2}%",
            tag,
            atlas.len(),
            atlas.size(),
            atlas.occupancy() * 100.0
        );
        if let Some(texture) = atlas.texture() {
            fs::create_dir_all(&cli.out_dir)
                .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
            let file = if tag == registry.default_tag() {
                format!("{}.png", cli.name)
            } else {
                format!("{}_{}.png", cli.name, tag)
            };
            let png_path = cli.out_dir.join(file);
            texture
                .save(&png_path)
                .with_context(|| format!("write {}", png_path.display()))?;
            info!(?png_path, "runtime texture written");
        }
    }
    Ok(())
}

/// First directory below `input` that holds `key`; files directly under `input`
/// share the default tag.
fn packing_tag(input: &Path, key: &str) -> String {
    let root = input.to_string_lossy().replace('\\', "/");
    let rel = key
        .strip_prefix(root.trim_end_matches('/'))
        .unwrap_or(key)
        .trim_start_matches('/');
    match rel.split_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => DEFAULT_PACKING_TAG.to_string(),
    }
}

/// YAML file (if any) first, then explicit flags on top.
fn build_static_config(args: &AtlasArgs) -> anyhow::Result<StaticAtlasConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let file = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let y: YamlConfig = serde_yaml::from_str(&file)?;
            y.into_static_config(StaticAtlasConfig::default())
                .with_context(|| format!("config {}", path.display()))?
        }
        None => StaticAtlasConfig::default(),
    };
    if let Some(v) = &args.heuristic {
        cfg.heuristic = parse_heuristic(v)?;
    }
    if let Some(v) = args.allow_flip {
        cfg.allow_flip = v;
    }
    if let Some(v) = args.min_size {
        cfg.min_size = v;
    }
    if let Some(v) = &args.max_size {
        cfg.max_size = parse_atlas_size(v)?;
    }
    if let Some(v) = args.spacing {
        cfg.space_between_sprites = v;
    }
    if let Some(v) = args.edge_padding {
        cfg.edge_pixel_padding = v;
    }
    if let Some(v) = args.greedy {
        cfg.greedy_batch = v;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_heuristic(s: &str) -> anyhow::Result<Heuristic> {
    s.parse::<Heuristic>()
        .map_err(|_| anyhow::anyhow!("unknown heuristic: {}", s))
}

/// Accepts a preset (`1024`, `1024x1024`) or any other positive side length.
fn parse_atlas_size(s: &str) -> anyhow::Result<u32> {
    if let Ok(preset) = s.parse::<maxrects_atlas_core::AtlasSizeType>() {
        return Ok(preset.to_size());
    }
    let side = s.split('x').next().unwrap_or(s).trim();
    match side.parse::<u32>() {
        Ok(v) if v > 0 => {
            if !v.is_power_of_two() {
                warn!(size = v, "atlas size is not a power of two");
            }
            Ok(v)
        }
        _ => anyhow::bail!("invalid atlas size: {}", s),
    }
}

fn read_sizes(path: &Path) -> anyhow::Result<Vec<SpriteInput<String>>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read sizes {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let sprites = if is_json {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    Ok(sprites)
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_glob_set(include)?;
    let exc_set = build_glob_set(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn build_glob_set(patterns: &[String]) -> anyhow::Result<Option<globset::GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn load_images_with_progress(
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<SpriteImage<String>>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(image) => {
                let key = p.to_string_lossy().replace('\\', "/");
                list.push(SpriteImage {
                    key,
                    image,
                    edge_padding: true,
                });
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<RgbaImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

//! rspawnpool 命令行入口

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rspawnpool::{
    ConfigManager, ExclusionPolicy, GlobalConfig, LocationMatchMode, PackWriter, RuleLoader, SpawnPipeline,
    build_tag_index, key_by_file_stem, load_tag_index,
};

#[derive(Parser)]
#[command(name = "rspawnpool", version)]
#[command(about = "Unify, deduplicate and block mob spawn rules across mods and datapacks")]
struct Cli {
    /// 扫描根目录（其下的 mods/ 与 datapacks/ 为规则来源）
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// 输出目录
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// 不排除传说/幻兽
    #[arg(long)]
    keep_legendaries: bool,

    /// 额外排除的实体关键字（可重复）
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// 详细日志
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 展开生物群系标签，写入生物群系数据库
    Tags,

    /// 采集并合并所有刷怪规则，写入统一数据包
    Unify {
        /// 跳过冗余消除
        #[arg(long)]
        no_clean: bool,
        /// 冗余消除时按展开后的生物群系集合比较
        #[arg(long)]
        resolved: bool,
    },

    /// 对已合并的数据包做冗余消除
    Clean {
        /// 统一数据包目录（默认为输出目录下的统一数据包）
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        resolved: bool,
    },

    /// 生成屏蔽全部原始刷怪文件的数据包
    Block,

    /// 生成传说保护包，屏蔽文件名或规则实体命中排除关键字的刷怪文件
    Protect,
}

impl Cli {
    fn config(&self) -> GlobalConfig {
        let exclusion = match (self.keep_legendaries, self.exclude.is_empty()) {
            (true, true) => ExclusionPolicy::None,
            (true, false) => ExclusionPolicy::Custom(self.exclude.clone()),
            (false, true) => ExclusionPolicy::Legendaries,
            (false, false) => ExclusionPolicy::LegendariesAnd(self.exclude.clone()),
        };
        let resolved = matches!(
            self.command,
            Command::Unify { resolved: true, .. } | Command::Clean { resolved: true, .. }
        );

        ConfigManager::custom()
            .root_dir(self.root.clone())
            .output_dir(self.output.clone())
            .exclusion(exclusion)
            .location_match(if resolved {
                LocationMatchMode::Resolved
            } else {
                LocationMatchMode::Literal
            })
            .verbose(self.verbose)
            .build()
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn pipeline_for(config: GlobalConfig) -> Result<SpawnPipeline> {
    let pipeline = match config.location_match {
        LocationMatchMode::Resolved => {
            let index = load_tag_index(&config).await.context("标签索引加载失败")?;
            SpawnPipeline::new(config).with_tag_index(index)
        }
        LocationMatchMode::Literal => SpawnPipeline::new(config),
    };
    Ok(pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config();

    match cli.command {
        Command::Tags => {
            let (_, db) = build_tag_index(&config).await?;
            PackWriter::new(&config).write_biome_database(&db).await?;
        }
        Command::Unify { no_clean, .. } => {
            let collected = RuleLoader::collect(&config).await.context("规则采集失败")?;
            collected.stats.print_stats();

            let pipeline = pipeline_for(config).await?;
            let config = pipeline.config();
            let writer = PackWriter::new(config);

            let unified = pipeline.unify(collected.rules);
            writer
                .write_spawn_pack(&config.unified_pack_name, "Unified spawn pools", &unified.table)
                .await?;

            if !no_clean {
                let cleaned = pipeline.clean(key_by_file_stem(unified.table));
                writer
                    .write_spawn_pack(&config.cleaned_pack_name, "Cleaned spawn pools", &cleaned.table)
                    .await?;
            }
        }
        Command::Clean { input, .. } => {
            let input = input.unwrap_or_else(|| config.output_dir.join(&config.unified_pack_name));
            let pipeline = pipeline_for(config).await?;
            let config = pipeline.config();

            let loaded = RuleLoader::load_pack(config, &input)
                .await
                .with_context(|| format!("读取数据包失败：{}", input.display()))?;
            loaded.stats.print_stats();

            let cleaned = pipeline.clean(loaded.rules);
            PackWriter::new(config)
                .write_spawn_pack(&config.cleaned_pack_name, "Cleaned spawn pools", &cleaned.table)
                .await?;
        }
        Command::Block => {
            let collected = RuleLoader::collect(&config).await.context("规则采集失败")?;
            let written = PackWriter::new(&config).write_blocker_pack(&collected.sources).await?;
            info!("已屏蔽 {} 个原始刷怪文件", written);
        }
        Command::Protect => {
            if config.exclusion.keywords().is_empty() {
                warn!("排除名单为空，保护包不会屏蔽任何文件");
            }
            let collected = RuleLoader::collect(&config).await.context("规则采集失败")?;
            let written = PackWriter::new(&config)
                .write_legendary_blocker(&collected.protected)
                .await?;
            info!("已屏蔽 {} 个传说刷怪文件，请将 {} 放在数据包列表最后加载", written, config.legendary_pack_name);
        }
    }
    Ok(())
}

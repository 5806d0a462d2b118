//! 全局配置管理,存储所有可配置项
//! 排除名单、特异度权重、命名空间约定等均集中在此，算法本身不含硬编码常量

use std::path::PathBuf;

/// 内置的传说/幻兽关键字（子串匹配）
pub const LEGENDARY_KEYWORDS: &[&str] = &[
    "articuno", "zapdos", "moltres", "mewtwo", "mew",
    "raikou", "entei", "suicune", "lugia", "hooh", "celebi",
    "regirock", "regice", "registeel", "latias", "latios", "kyogre", "groudon", "rayquaza", "jirachi", "deoxys",
    "uxie", "mesprit", "azelf", "dialga", "palkia", "heatran", "regigigas", "giratina", "cresselia", "phione",
    "manaphy", "darkrai", "shaymin", "arceus",
    "victini", "cobalion", "terrakion", "virizion", "tornadus", "thundurus", "reshiram", "zekrom", "landorus",
    "kyurem", "keldeo", "meloetta", "genesect",
    "xerneas", "yveltal", "zygarde", "diancie", "hoopa", "volcanion",
    "typenull", "silvally", "tapukoko", "tapulele", "tapubulu", "tapufini", "cosmog", "cosmoem", "solgaleo",
    "lunala", "nihilego", "buzzwole", "pheromosa", "xurkitree", "celesteela", "kartana", "guzzlord", "necrozma",
    "magearna", "marshadow", "poipole", "naganadel", "stakataka", "blacephalon", "zeraora", "meltan", "melmetal",
    "zacian", "zamazenta", "eternatus", "kubfu", "urshifu", "zarude", "regieleki", "regidrago", "glastrier",
    "spectrier", "calyrex", "enamorus",
    "koraidon", "miraidon", "walkingwake", "ironleaves", "okidogi", "munkidori", "fezandipiti", "ogerpon",
    "terapagos",
    "roaringmoon", "ironvaliant", "greattusk", "screamtail", "brutebonnet", "fluttermane", "sandyshocks",
    "ironbundle", "ironhands", "ironjugulis", "ironmoth", "ironthorns", "gougeingfire", "ragingbolt",
    "ironboulder", "ironcrown",
];

/// 实体排除策略（命中即整体丢弃该实体的全部规则）
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionPolicy {
    /// 不排除任何实体
    None,
    /// 内置传说名单
    Legendaries,
    /// 仅使用自定义关键字
    Custom(Vec<String>),
    /// 内置传说名单 + 自定义关键字
    LegendariesAnd(Vec<String>),
}

impl ExclusionPolicy {
    /// 展开为小写关键字列表
    pub fn keywords(&self) -> Vec<String> {
        let builtin = || LEGENDARY_KEYWORDS.iter().map(|k| k.to_string());
        match self {
            ExclusionPolicy::None => Vec::new(),
            ExclusionPolicy::Legendaries => builtin().collect(),
            ExclusionPolicy::Custom(extra) => extra.iter().map(|k| k.to_lowercase()).collect(),
            ExclusionPolicy::LegendariesAnd(extra) => builtin()
                .chain(extra.iter().map(|k| k.to_lowercase()))
                .collect(),
        }
    }
}

/// 位置组比较方式（冗余消除阶段使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMatchMode {
    /// 直接比较原始标识符
    #[default]
    Literal,
    /// 经标签解析展开为具体位置集合后再比较
    Resolved,
}

/// 特异度评分权重
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecificityWeights {
    pub time_range: u32,
    pub weather: u32,
    /// minY / maxY 任一存在
    pub vertical_bound: u32,
    /// minSkyLight / maxSkyLight 任一存在
    pub light_bound: u32,
    pub can_see_sky: u32,
    /// 非空位置组列表
    pub location_groups: u32,
    /// 存在非空反条件
    pub anti_condition: u32,
}

impl Default for SpecificityWeights {
    fn default() -> Self {
        Self {
            time_range: 2,
            weather: 2,
            vertical_bound: 2,
            light_bound: 1,
            can_see_sky: 3,
            location_groups: 1,
            anti_condition: 1,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // ========== 标识符约定 ==========
    /// 缺省命名空间
    pub default_namespace: String,
    /// 标签引用前缀
    pub tag_marker: char,
    /// 实体命名空间（提取实体名时剥离）
    pub entity_namespace: String,
    /// 空白位置组条目的替换值
    pub overworld_reference: String,
    /// 视为“整个主世界”的标识符
    pub overworld_ids: Vec<String>,

    // ========== 合并/去重 ==========
    pub exclusion: ExclusionPolicy,
    /// 计算签名时忽略的规则字段
    pub ignored_signature_fields: Vec<String>,
    pub specificity: SpecificityWeights,
    pub location_match: LocationMatchMode,
    /// 合并后权重保留的小数位数
    pub weight_precision: u32,
    pub default_weight: f64,

    // ========== 输入输出 ==========
    /// 扫描根目录
    pub root_dir: PathBuf,
    /// 根目录下的规则来源目录
    pub source_dirs: Vec<String>,
    pub spawn_dir_marker: String,
    pub tag_dir_marker: String,
    pub output_dir: PathBuf,
    pub blocker_pack_name: String,
    pub unified_pack_name: String,
    pub cleaned_pack_name: String,
    /// 传说保护包（最后加载，屏蔽排除名单中的实体）
    pub legendary_pack_name: String,
    pub biome_database_file: PathBuf,
    pub pack_format: u32,
    /// 屏蔽包中跳过的路径关键字（NPC、结构等）
    pub blocker_ignored_keywords: Vec<String>,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_namespace: "minecraft".to_string(),
            tag_marker: '#',
            entity_namespace: "cobblemon".to_string(),
            overworld_reference: "#cobblemon:is_overworld".to_string(),
            overworld_ids: vec![
                "minecraft:is_overworld".to_string(),
                "cobblemon:is_overworld".to_string(),
            ],
            exclusion: ExclusionPolicy::Legendaries,
            ignored_signature_fields: ["id", "_comment", "weight", "q", "bucket_weight"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            specificity: SpecificityWeights::default(),
            location_match: LocationMatchMode::Literal,
            weight_precision: 2,
            default_weight: 1.0,
            root_dir: PathBuf::from("."),
            source_dirs: vec!["mods".to_string(), "datapacks".to_string()],
            spawn_dir_marker: "spawn_pool_world".to_string(),
            tag_dir_marker: "tags/worldgen/biome".to_string(),
            output_dir: PathBuf::from("."),
            blocker_pack_name: "00_Total_Spawn_Blocker".to_string(),
            unified_pack_name: "01_Unified_Spawns".to_string(),
            cleaned_pack_name: "03_Final_Cleaned_Spawns".to_string(),
            legendary_pack_name: "03_Legendary_Protection".to_string(),
            biome_database_file: PathBuf::from("biome_database.json"),
            pack_format: 15,
            blocker_ignored_keywords: ["npc", "trainer", "structure", "village"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 来源目录的完整路径
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.source_dirs.iter().map(|d| self.root_dir.join(d)).collect()
    }
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.default_namespace = namespace.into();
        self
    }

    pub fn overworld_reference(mut self, reference: impl Into<String>) -> Self {
        self.config.overworld_reference = reference.into();
        self
    }

    pub fn overworld_ids(mut self, ids: Vec<String>) -> Self {
        self.config.overworld_ids = ids;
        self
    }

    pub fn exclusion(mut self, policy: ExclusionPolicy) -> Self {
        self.config.exclusion = policy;
        self
    }

    pub fn specificity(mut self, weights: SpecificityWeights) -> Self {
        self.config.specificity = weights;
        self
    }

    pub fn location_match(mut self, mode: LocationMatchMode) -> Self {
        self.config.location_match = mode;
        self
    }

    pub fn weight_precision(mut self, precision: u32) -> Self {
        self.config.weight_precision = precision;
        self
    }

    pub fn root_dir(mut self, path: PathBuf) -> Self {
        self.config.root_dir = path;
        self
    }

    pub fn source_dirs(mut self, dirs: Vec<String>) -> Self {
        self.config.source_dirs = dirs;
        self
    }

    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.config.output_dir = path;
        self
    }

    pub fn biome_database_file(mut self, path: PathBuf) -> Self {
        self.config.biome_database_file = path;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

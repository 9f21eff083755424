/// Column-name candidates and output column names for the restoration core.
/// Candidate lists are ordered most to least specific: the resolver returns
/// the first candidate that matches any column.

// ── Characterization (BD_caracterizacao) ────────────────────────────────────
pub mod characterization {
    pub const PROPERTY: &[&str] = &["cod_prop", "codigo_propriedade", "propriedade"];
    pub const WORK_UNIT: &[&str] = &["ut", "unidade_trabalho"];
    pub const TECHNIQUE: &[&str] = &["tecnica_am", "tecnica", "metodo"];
    pub const CANOPY_COVER: &[&str] = &["cobetura_nativa", "cobertura_nativa", "copa_nativa"];
    pub const RESTORATION_METHOD: &[&str] =
        &["metodo_restauracao", "tecnica_restauracao", "metodo"];
    pub const RICHNESS_TARGET: &[&str] = &["meta_riqueza", "riqueza_meta", "meta_especies"];
}

// ── Inventory (BD_inventario) ───────────────────────────────────────────────
pub mod inventory {
    pub const PLOT_CODE: &[&str] = &["cod_parc", "codigo_parcela", "parcela"];
    pub const PROPERTY: &[&str] = &["cod_prop", "codigo_propriedade", "propriedade"];
    pub const WORK_UNIT: &[&str] = &["ut", "unidade_trabalho"];
    pub const TAG: &[&str] = &["plaqueta", "plaq", "id"];
    pub const SPECIES: &[&str] = &["especies", "especie", "species", "sp"];
    pub const ORIGIN: &[&str] = &["origem", "origin"];
    pub const AGE_CLASS: &[&str] = &["idade", "class_idade", "age"];
    pub const HEIGHT: &[&str] = &["ht", "altura", "height", "h"];
    pub const DIAMETER: &[&str] = &["dap", "dap_cm", "diameter", "diametro"];
    pub const AREA_HA: &[&str] = &["area_ha", "area"];
    pub const RICHNESS_TARGET: &[&str] = &["meta_riqueza", "riqueza_meta", "meta_especies"];
}

// ── Cover indicators and disturbances (characterization summary) ────────────
pub mod cover {
    pub const INDICATORS: &[(&str, &[&str])] = &[
        ("native_canopy", &["cobetura_nativa", "cobertura_nativa", "copa_nativa"]),
        ("grass", &["graminea"]),
        ("herbaceous", &["herbacea", "herbac"]),
        ("bare_soil", &["solo_exposto", "solo exposto"]),
        ("straw", &["palhada"]),
        ("litter", &["serapilheira"]),
        ("exotic_cover", &["cobetura_exotica", "cobertura_exotica"]),
    ];

    pub const DISTURBANCES: &[(&str, &[&str])] = &[
        ("erosion", &["erosiv"]),
        ("domestic_animals", &["animais_domest", "domesticos"]),
        ("ants_termites", &["formiga", "cupins"]),
        ("fire", &["fogo"]),
        ("wood_cutting", &["corte", "madeira"]),
        ("flooding", &["inunda"]),
    ];
}

// ── Text markers (matched case-insensitively as substrings) ─────────────────
pub mod markers {
    pub const CENSUS: &[&str] = &["censo", "census"];
    pub const PLOT: &[&str] = &["parcela", "plot"];
    pub const DEAD: &[&str] = &["morta", "morto", "dead"];
    pub const NATIVE: &[&str] = &["nativ"];
    pub const YOUNG: &[&str] = &["jovem", "juvenil", "young"];
    pub const ASSISTED: &[&str] = &["assistida", "assisted"];
    pub const ABSENT: &[&str] = &["não", "nao", "0"];
}

// ── Algorithm constants ─────────────────────────────────────────────────────
pub mod constants {
    /// Fixed subplot size for the plot technique.
    pub const PLOT_AREA_M2: f64 = 100.0;
    pub const M2_PER_HA: f64 = 10_000.0;
    /// Regenerant height cut, inclusive of 0.5 m.
    pub const REGENERANT_MIN_HEIGHT: f64 = 0.499;
    /// Richness height cut, strictly above 0.5 m.
    pub const RICHNESS_MIN_HEIGHT: f64 = 0.5;
    /// Median diameter above which the column is read as millimetres.
    pub const DIAMETER_MM_MEDIAN: f64 = 100.0;
    pub const PLOT_CODE_SEPARATOR: char = '_';
}

// ── Species table columns ───────────────────────────────────────────────────
pub mod species_table {
    pub const SPECIES: &str = "species";
    pub const INDIVIDUALS: &str = "individuals";
    pub const BASAL_AREA_M2: &str = "basal_area_m2";
    pub const PLOTS: &str = "plots";
    pub const ABSOLUTE_DENSITY: &str = "absolute_density";
    pub const ABSOLUTE_DOMINANCE: &str = "absolute_dominance";
    pub const RELATIVE_DENSITY: &str = "relative_density";
    pub const RELATIVE_DOMINANCE: &str = "relative_dominance";
    pub const RELATIVE_FREQUENCY: &str = "relative_frequency";
    pub const COVERAGE_VALUE: &str = "coverage_value";
    pub const IMPORTANCE_VALUE: &str = "importance_value";
}

// ── Restoration scorecard columns ───────────────────────────────────────────
pub mod scorecard {
    pub const PROPERTY: &str = "cod_prop";
    pub const CANOPY_COVER: &str = "canopy_cover";
    pub const RESTORATION_METHOD: &str = "restoration_method";
    pub const REGENERANT_DENSITY: &str = "regenerant_density";
    pub const DENSITY_TARGET: &str = "density_target";
    pub const OBSERVED_RICHNESS: &str = "observed_richness";
    pub const RICHNESS_TARGET: &str = "richness_target";
    pub const CANOPY_OK: &str = "canopy_ok";
    pub const DENSITY_OK: &str = "density_ok";
    pub const RICHNESS_OK: &str = "richness_ok";
    pub const STATUS: &str = "status";
}

// ── Default snapshot file names ─────────────────────────────────────────────
pub mod files {
    pub const CHARACTERIZATION: &str = "BD_caracterizacao.csv";
    pub const INVENTORY: &str = "BD_inventario.csv";
}

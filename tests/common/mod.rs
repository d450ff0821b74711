use covsum::model::{Arc, ArcSet, CodeRegion, FileFacts, LineNo, LineSet, RegionKind};

pub fn lines(nums: &[LineNo]) -> LineSet {
    nums.iter().copied().collect()
}

pub fn arcs(pairs: &[Arc]) -> ArcSet {
    pairs.iter().copied().collect()
}

/// Facts for a small module with two if/elif chains: eight statements,
/// five executed, three branch lines each taken one way. The `(8, -1)`
/// arc jumps to the module-exit sentinel.
pub fn chain_facts() -> FileFacts {
    FileFacts {
        statements: lines(&[1, 2, 3, 4, 5, 7, 8, 9]),
        executed: lines(&[1, 2, 4, 5, 8]),
        possible_arcs: Some(arcs(&[(2, 3), (2, 4), (4, 5), (4, 7), (8, 9), (8, -1)])),
        executed_arcs: Some(arcs(&[(2, 4), (4, 5), (8, -1)])),
        ..FileFacts::default()
    }
}

/// Facts for a module defining a function `c` plus classes `C` (empty)
/// and `D` with methods `e` and `f`, none of which ever ran. Function
/// regions hold the body lines; class regions hold their methods' lines.
pub fn region_facts() -> FileFacts {
    FileFacts {
        statements: lines(&[1, 3, 4, 6, 7, 9, 10, 11, 12, 13]),
        executed: lines(&[1, 3, 6, 7, 9, 10, 12]),
        regions: vec![
            CodeRegion {
                kind: RegionKind::Function,
                name: "c".to_string(),
                lines: lines(&[4]),
            },
            CodeRegion {
                kind: RegionKind::Function,
                name: "D.e".to_string(),
                lines: lines(&[11]),
            },
            CodeRegion {
                kind: RegionKind::Function,
                name: "D.f".to_string(),
                lines: lines(&[13]),
            },
            CodeRegion {
                kind: RegionKind::Class,
                name: "C".to_string(),
                lines: lines(&[]),
            },
            CodeRegion {
                kind: RegionKind::Class,
                name: "D".to_string(),
                lines: lines(&[11, 13]),
            },
        ],
        ..FileFacts::default()
    }
}

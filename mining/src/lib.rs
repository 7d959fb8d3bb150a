pub mod analysis;
pub mod report;
pub mod writer;

pub use analysis::{
    analyze, tokenize, CategoryCount, CollectionStats, CommentAnalysis, CommentFinding,
    ItemFinding, KeywordCount, Miner, MiningResult, OTHER_CATEGORY,
};
pub use report::{
    CategoryEntry, CategoryItem, RenderedReport, ReportGenerator, ReportSnapshot,
};
pub use writer::ReportWriter;

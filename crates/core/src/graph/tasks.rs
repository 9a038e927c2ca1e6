//! Per-stage task declarations.

use std::path::PathBuf;

use super::{HintFiles, Stage, Step, TaskKey, TaskPlan, hint_pairs, instruct_triples, integrate_args};
use crate::{context::BuildContext, error::PlanError};

const CONFIG_ORACLE: &str = "config";
const HINT_JOBS_ORACLE: &str = "hint-jobs";
const VERSION_ORACLE: &str = "version";

/// Declare the task identified by `key`.
pub fn declare(ctx: &BuildContext, key: &TaskKey) -> Result<TaskPlan, PlanError> {
    let decl = Declarer { ctx, key };
    match key.stage {
        Stage::Extract => decl.extract(decl.weight()?),
        Stage::ExtractedFont => decl.extracted_font(decl.weight()?, decl.region()?),
        Stage::Convert => decl.convert(decl.weight()?, decl.region()?),
        Stage::Autohint => decl.autohint(decl.weight()?),
        Stage::HintedFont => decl.hinted_font(decl.weight()?, decl.region()?),
        Stage::Dump => decl.dump(decl.weight()?, decl.region()?),
        Stage::GroupHint => decl.group_hint(decl.weight()?),
        Stage::GroupInstruct => decl.group_instruct(decl.weight()?),
        Stage::Integrate => decl.integrate(decl.weight()?, decl.region()?),
        Stage::Rebuild => decl.rebuild(decl.weight()?, decl.region()?),
        Stage::Bundle => decl.bundle(decl.weight()?),
        Stage::ArchiveFonts => Ok(decl.archive_fonts()),
        Stage::ArchiveCollections => Ok(decl.archive_collections()),
    }
}

struct Declarer<'a> {
    ctx: &'a BuildContext,
    key: &'a TaskKey,
}

impl<'a> Declarer<'a> {
    fn weight(&self) -> Result<&'a str, PlanError> {
        let weight =
            self.key.weight.as_deref().ok_or_else(|| PlanError::MalformedKey(self.key.to_string()))?;
        if !self.ctx.config.has_weight(weight) {
            return Err(PlanError::UnknownWeight(weight.to_string()));
        }
        Ok(weight)
    }

    fn region(&self) -> Result<&'a str, PlanError> {
        let region =
            self.key.region.as_deref().ok_or_else(|| PlanError::MalformedKey(self.key.to_string()))?;
        if !self.ctx.config.has_region(region) {
            return Err(PlanError::UnknownRegion(region.to_string()));
        }
        Ok(region)
    }

    fn plan(&self) -> TaskPlan {
        TaskPlan::new(self.key.clone())
    }

    fn regions(&self) -> &'a [String] {
        &self.ctx.config.regions
    }

    fn stem(&self, weight: &str, region: &str) -> String {
        self.ctx.config.font_stem(region, weight)
    }

    fn hint_files(&self, weight: &str, region: &str) -> HintFiles {
        let layout = &self.ctx.layout;
        HintFiles::new(&layout.pass3(), &layout.pass4(), &self.stem(weight, region))
    }

    fn region_hint_files(&self, weight: &str) -> Vec<HintFiles> {
        self.regions().iter().map(|r| self.hint_files(weight, r)).collect()
    }

    fn pass1_otf(&self, weight: &str, region: &str) -> PathBuf {
        self.ctx.layout.pass1().join(format!("{}.otf", self.stem(weight, region)))
    }

    fn pass1_ttf(&self, weight: &str, region: &str) -> PathBuf {
        self.ctx.layout.pass1().join(format!("{}.ttf", self.stem(weight, region)))
    }

    fn pass2_ttf(&self, weight: &str, region: &str) -> PathBuf {
        self.ctx.layout.pass2().join(format!("{}.ttf", self.stem(weight, region)))
    }

    fn final_ttf(&self, weight: &str, region: &str) -> PathBuf {
        self.ctx.layout.fonts_out.join(format!("{}.ttf", self.stem(weight, region)))
    }

    fn collection(&self, weight: &str) -> PathBuf {
        self.ctx
            .layout
            .collections_out
            .join(format!("{}.ttc", self.ctx.config.collection_stem(weight)))
    }

    fn each_region(&self, stage: Stage, weight: &str) -> Vec<TaskKey> {
        self.regions().iter().map(|r| TaskKey::region(stage, weight, r)).collect()
    }

    // Pass 1

    fn extract(&self, weight: &str) -> Result<TaskPlan, PlanError> {
        let layout = &self.ctx.layout;
        let config = &self.ctx.config;
        let source = layout.src.join(format!("{}.ttc", config.collection_stem(weight)));

        let mut plan = self
            .plan()
            .input(source.clone())
            .oracle(CONFIG_ORACLE, self.ctx.config_oracle())
            .step(Step::CreateDir(layout.pass1()))
            .run(self.ctx.tools.splitter.command().path(&source));

        // Regions missing from this weight's collection are skipped here and
        // only fail once something downstream asks for them.
        for region in &config.all_regions {
            let name = format!("{}.otf", self.stem(weight, region));
            plan = plan.step(Step::MoveIfPresent {
                from: layout.src.join(&name),
                to: layout.pass1().join(&name),
            });
        }
        Ok(plan)
    }

    fn extracted_font(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let otf = self.pass1_otf(weight, region);
        Ok(self
            .plan()
            .need(TaskKey::weight(Stage::Extract, weight))
            .output(otf.clone())
            .step(Step::AssertExists(otf)))
    }

    fn convert(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let input = self.pass1_otf(weight, region);
        let output = self.pass1_ttf(weight, region);
        let command = self.ctx.tools.converter.command().arg("-o").path(&output).path(&input);
        Ok(self
            .plan()
            .need(TaskKey::region(Stage::ExtractedFont, weight, region))
            .input(input)
            .output(output)
            .run(command))
    }

    // Pass 2

    fn autohint(&self, weight: &str) -> Result<TaskPlan, PlanError> {
        let layout = &self.ctx.layout;
        let tools = &self.ctx.tools;
        let stem = self.ctx.config.collection_stem(weight);
        let output = layout.pass2().join(format!("{stem}.ttc"));
        let scratch = layout.pass2().join(format!("{stem}.temp.ttc"));
        let inputs: Vec<PathBuf> = self.regions().iter().map(|r| self.pass1_ttf(weight, r)).collect();
        let split: Vec<PathBuf> = self.regions().iter().map(|r| self.pass2_ttf(weight, r)).collect();

        Ok(self
            .plan()
            .needs(self.each_region(Stage::Convert, weight))
            .inputs(inputs.iter().cloned())
            .oracle(CONFIG_ORACLE, self.ctx.config_oracle())
            .output(output.clone())
            .outputs(split)
            .run(tools.merger.command().arg("-o").path(&scratch).paths(&inputs))
            .run(tools.autohinter.command().path(&scratch).path(&output))
            .step(Step::Remove(scratch))
            .run(tools.splitter.command().path(&output)))
    }

    fn hinted_font(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let ttf = self.pass2_ttf(weight, region);
        Ok(self
            .plan()
            .need(TaskKey::weight(Stage::Autohint, weight))
            .output(ttf.clone())
            .step(Step::AssertExists(ttf)))
    }

    // Pass 3

    fn dump(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let input = self.pass2_ttf(weight, region);
        let output = self.hint_files(weight, region).dump;
        let command = self.ctx.tools.dumper.command().path(&input).arg("-o").path(&output);
        Ok(self
            .plan()
            .need(TaskKey::region(Stage::HintedFont, weight, region))
            .input(input)
            .output(output)
            .run(command))
    }

    fn group_hint(&self, weight: &str) -> Result<TaskPlan, PlanError> {
        let layout = &self.ctx.layout;
        let params = layout.hint_params(weight);
        let cache = layout.pass3().join(format!("hint-cache-{weight}.gz"));
        let files = self.region_hint_files(weight);

        let command = self
            .ctx
            .tools
            .hinter
            .command()
            .arg("hint")
            .arg("-c")
            .path(&params)
            .arg("-h")
            .path(&cache)
            .arg("--jobs")
            .arg(self.ctx.hint_jobs.to_string())
            .args(hint_pairs(&files));

        Ok(self
            .plan()
            .needs(self.each_region(Stage::Dump, weight))
            .input(params)
            .inputs(files.iter().map(|f| f.dump.clone()))
            .oracle(CONFIG_ORACLE, self.ctx.config_oracle())
            .oracle(HINT_JOBS_ORACLE, self.ctx.hint_jobs.to_string())
            .outputs(files.iter().map(|f| f.hints.clone()))
            .run(command))
    }

    fn group_instruct(&self, weight: &str) -> Result<TaskPlan, PlanError> {
        let params = self.ctx.layout.hint_params(weight);
        let files = self.region_hint_files(weight);
        // Instruction synthesis waits for hinting of every weight, but only
        // its own weight's hints have to succeed.
        let other_hints = self
            .ctx
            .config
            .weights
            .iter()
            .filter(|w| w.as_str() != weight)
            .map(|w| TaskKey::weight(Stage::GroupHint, w));

        let command = self
            .ctx
            .tools
            .hinter
            .command()
            .arg("instruct")
            .arg("-c")
            .path(&params)
            .args(instruct_triples(&files));

        Ok(self
            .plan()
            .needs(self.each_region(Stage::Dump, weight))
            .need(TaskKey::weight(Stage::GroupHint, weight))
            .after(other_hints)
            .input(params)
            .inputs(files.iter().flat_map(|f| [f.dump.clone(), f.hints.clone()]))
            .oracle(CONFIG_ORACLE, self.ctx.config_oracle())
            .outputs(files.iter().map(|f| f.instructions.clone()))
            .run(command))
    }

    // Pass 4

    fn integrate(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let params = self.ctx.layout.hint_params(weight);
        let files = self.hint_files(weight, region);
        let command = self
            .ctx
            .tools
            .hinter
            .command()
            .arg("integrate")
            .arg("-c")
            .path(&params)
            .args(integrate_args(&files));

        Ok(self
            .plan()
            .need(TaskKey::weight(Stage::GroupInstruct, weight))
            .input(params)
            .input(files.instructions)
            .input(files.dump)
            .output(files.integrated)
            .run(command))
    }

    // Pass 5

    fn rebuild(&self, weight: &str, region: &str) -> Result<TaskPlan, PlanError> {
        let input = self.hint_files(weight, region).integrated;
        let output = self.final_ttf(weight, region);
        let command = self
            .ctx
            .tools
            .rebuilder
            .command()
            .path(&input)
            .arg("-o")
            .path(&output)
            .args(["-k", "-s", "--keep-average-char-width", "-q"]);

        Ok(self
            .plan()
            .need(TaskKey::region(Stage::Integrate, weight, region))
            .input(input)
            .output(output)
            .run(command))
    }

    fn bundle(&self, weight: &str) -> Result<TaskPlan, PlanError> {
        let inputs: Vec<PathBuf> = self.regions().iter().map(|r| self.final_ttf(weight, r)).collect();
        let output = self.collection(weight);
        let command = self
            .ctx
            .tools
            .bundler
            .command()
            .args(["-x", "--common-width", "1000", "--common-height", "1000"])
            .arg("-o")
            .path(&output)
            .paths(&inputs);

        Ok(self
            .plan()
            .needs(self.each_region(Stage::Rebuild, weight))
            .inputs(inputs)
            .oracle(CONFIG_ORACLE, self.ctx.config_oracle())
            .output(output)
            .run(command))
    }

    // Release

    fn archive_name(&self, kind: &str) -> PathBuf {
        let config = &self.ctx.config;
        self.ctx
            .layout
            .release
            .join(format!("{}-{kind}-{}.zip", config.prefix, self.ctx.version.tag))
    }

    fn archive_fonts(&self) -> TaskPlan {
        let config = &self.ctx.config;
        let output = self.archive_name("TTF");
        let mut plan = self.plan();
        for weight in &config.weights {
            for region in &config.regions {
                plan = plan
                    .need(TaskKey::region(Stage::Rebuild, weight, region))
                    .input(self.final_ttf(weight, region));
            }
        }
        plan.oracle(VERSION_ORACLE, self.ctx.version.tag.clone())
            .output(output.clone())
            .step(Step::Archive {
                output,
                dir: self.ctx.layout.fonts_out.clone(),
                pattern: "*.ttf".to_string(),
            })
    }

    fn archive_collections(&self) -> TaskPlan {
        let config = &self.ctx.config;
        let output = self.archive_name("TTC");
        let mut plan = self.plan();
        for weight in &config.weights {
            plan = plan.need(TaskKey::weight(Stage::Bundle, weight)).input(self.collection(weight));
        }
        plan.oracle(VERSION_ORACLE, self.ctx.version.tag.clone())
            .output(output.clone())
            .step(Step::Archive {
                output,
                dir: self.ctx.layout.collections_out.clone(),
                pattern: "*.ttc".to_string(),
            })
    }
}

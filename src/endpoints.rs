use crate::domain::DatasetPath;

pub const DEFAULT_BASE_URL: &str = "https://portal-auth.nersc.gov/als";
pub const DEFAULT_FACILITY: &str = "als/bl832";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    facility: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_FACILITY)
    }
}

impl Endpoints {
    pub fn new(base_url: &str, facility: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            facility: facility.trim_matches('/').to_string(),
        }
    }

    pub fn auth(&self) -> String {
        format!("{}/auth", self.base_url)
    }

    pub fn search(&self) -> String {
        self.hdf("search")
    }

    pub fn derived_datasets(&self) -> String {
        self.hdf("dataset")
    }

    pub fn tomopy_job(&self) -> String {
        self.hdf("tomopyjob")
    }

    pub fn attributes(&self, dataset: &DatasetPath) -> String {
        self.per_dataset("attributes", dataset)
    }

    pub fn list_images(&self, dataset: &DatasetPath) -> String {
        self.per_dataset("listimages", dataset)
    }

    pub fn stage(&self, dataset: &DatasetPath) -> String {
        self.per_dataset("stageifneeded", dataset)
    }

    pub fn download(&self, dataset: &DatasetPath) -> String {
        self.per_dataset("download", dataset)
    }

    pub fn raw_image(&self, derived_path: &str) -> String {
        self.per_derived("rawdata", derived_path)
    }

    pub fn image_urls(&self, derived_path: &str) -> String {
        self.per_derived("image", derived_path)
    }

    fn hdf(&self, operation: &str) -> String {
        format!("{}/hdf/{operation}", self.base_url)
    }

    fn per_dataset(&self, operation: &str, dataset: &DatasetPath) -> String {
        format!(
            "{}/{}/{}",
            self.hdf(operation),
            self.facility,
            dataset.raw_file()
        )
    }

    fn per_derived(&self, operation: &str, derived_path: &str) -> String {
        format!(
            "{}/{}",
            self.hdf(operation),
            derived_path.trim_start_matches('/')
        )
    }
}

pub fn image_group(image: &str) -> String {
    format!("/{}", image.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_dataset_urls() {
        let endpoints = Endpoints::default();
        let dataset = DatasetPath::resolve("hmwood/20130713_185717_sample.h5", None, "me");
        assert_eq!(
            endpoints.download(&dataset),
            "https://portal-auth.nersc.gov/als/hdf/download/als/bl832/hmwood/20130713_185717_sample/raw/20130713_185717_sample.h5"
        );
        assert_eq!(
            endpoints.stage(&dataset),
            "https://portal-auth.nersc.gov/als/hdf/stageifneeded/als/bl832/hmwood/20130713_185717_sample/raw/20130713_185717_sample.h5"
        );
    }

    #[test]
    fn derived_urls_join_single_slash() {
        let endpoints = Endpoints::new("http://localhost:8080/als/", "/als/bl832/");
        assert_eq!(
            endpoints.raw_image("/als/bl832/u/s/norm/s-norm.h5"),
            "http://localhost:8080/als/hdf/rawdata/als/bl832/u/s/norm/s-norm.h5"
        );
        assert_eq!(endpoints.image_urls("p1"), "http://localhost:8080/als/hdf/image/p1");
        assert_eq!(endpoints.auth(), "http://localhost:8080/als/auth");
    }

    #[test]
    fn image_group_has_one_leading_slash() {
        assert_eq!(image_group("img1.tif"), "/img1.tif");
        assert_eq!(image_group("/scan/img1.tif"), "/scan/img1.tif");
    }
}

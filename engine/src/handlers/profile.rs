use chrono::Datelike;

use super::MenuHandlers;
use crate::error::Result;
use crate::l10n::Text;
use crate::profile::{ProfileBuffer, ProfileField};
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;
use crate::validate::is_valid_yob;

impl MenuHandlers {
    /// Capture or commit one profile field.
    ///
    /// Before authorization the value is staged in `TEMPORARY_VALUE`, and
    /// also buffered while the field has never been set. Once
    /// `flag_allow_update` is raised the staged value becomes permanent.
    async fn save_profile_field(
        &self,
        req: &Request,
        input: &str,
        field: ProfileField,
    ) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let allow_update = self.flag("flag_allow_update")?;
        let field_set = self.flag(field.flag_name())?;

        if req.is_set(allow_update) {
            let staged = self
                .read_required(session_id, DataType::TEMPORARY_VALUE)
                .await?;
            self.write(session_id, field.data_type(), &staged).await?;
            return Ok(HandlerResult::new().set(field_set));
        }

        let value = input.trim();
        if !req.is_set(field_set) {
            let mut buffer = ProfileBuffer::decode(
                &self
                    .read_optional(session_id, DataType::PROFILE_BUFFER)
                    .await?
                    .unwrap_or_default(),
            );
            buffer.insert_or_shift(field.index(), value);
            self.write(session_id, DataType::PROFILE_BUFFER, &buffer.encode())
                .await?;
        }
        self.write(session_id, DataType::TEMPORARY_VALUE, value)
            .await?;
        Ok(HandlerResult::new())
    }

    pub async fn save_firstname(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        self.save_profile_field(req, input, ProfileField::FirstName)
            .await
    }

    pub async fn save_familyname(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        self.save_profile_field(req, input, ProfileField::FamilyName)
            .await
    }

    pub async fn save_yob(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        self.save_profile_field(req, input, ProfileField::YearOfBirth)
            .await
    }

    /// The gender menu passes the chosen label, not the selector.
    pub async fn save_gender(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let gender = match input.trim() {
            "1" => "male",
            "2" => "female",
            "3" => "unspecified",
            other => other,
        };
        self.save_profile_field(req, gender, ProfileField::Gender)
            .await
    }

    pub async fn save_location(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        self.save_profile_field(req, input, ProfileField::Location)
            .await
    }

    pub async fn save_offerings(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        self.save_profile_field(req, input, ProfileField::Offerings)
            .await
    }

    pub async fn verify_yob(&self, _req: &Request, input: &str) -> Result<HandlerResult> {
        let incorrect_date = self.flag("flag_incorrect_date_format")?;
        Ok(if is_valid_yob(input.trim()) {
            HandlerResult::new().reset(incorrect_date)
        } else {
            HandlerResult::with_content(input.trim()).set(incorrect_date)
        })
    }

    pub async fn reset_incorrect_date_format(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_incorrect_date_format")?))
    }

    /// Commit every buffered value whose field has no permanent value yet.
    pub async fn update_all_profile_items(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;

        let buffer = ProfileBuffer::decode(
            &self
                .read_optional(session_id, DataType::PROFILE_BUFFER)
                .await?
                .unwrap_or_default(),
        );
        let mut res = HandlerResult::new();
        for field in ProfileField::ALL {
            let field_set = self.flag(field.flag_name())?;
            if req.is_set(field_set) {
                continue;
            }
            if let Some(value) = buffer.get(field) {
                self.write(session_id, field.data_type(), value).await?;
                res.set_flag(field_set);
            }
        }
        self.clear(session_id, DataType::PROFILE_BUFFER).await?;
        Ok(res)
    }

    pub async fn get_profile_info(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let lang = req.language();
        let not_provided = Text::NotProvided.get(lang);

        let first = self.read_optional(session_id, DataType::FIRST_NAME).await?;
        let family = self.read_optional(session_id, DataType::FAMILY_NAME).await?;
        let gender = self.read_optional(session_id, DataType::GENDER).await?;
        let yob = self.read_optional(session_id, DataType::YOB).await?;
        let location = self.read_optional(session_id, DataType::LOCATION).await?;
        let offerings = self.read_optional(session_id, DataType::OFFERINGS).await?;

        let name = match (first, family) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(n), None) | (None, Some(n)) => n,
            (None, None) => not_provided.to_string(),
        };
        let age = yob
            .and_then(|y| y.parse::<i32>().ok())
            .map(|y| (chrono::Utc::now().year() - y).to_string());
        let or_missing = |v: Option<String>| v.unwrap_or_else(|| not_provided.to_string());

        let gender = or_missing(gender);
        let age = or_missing(age);
        let location = or_missing(location);
        let offerings = or_missing(offerings);
        Ok(HandlerResult::with_content(Text::ProfileInfo.render(
            lang,
            &[
                ("name", name.as_str()),
                ("gender", gender.as_str()),
                ("age", age.as_str()),
                ("location", location.as_str()),
                ("offerings", offerings.as_str()),
            ],
        )))
    }

    /// Current value of the field edited at node `symbol`.
    pub async fn get_current_profile_info(
        &self,
        req: &Request,
        symbol: &str,
        _input: &str,
    ) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let Some(field) = field_for_symbol(symbol) else {
            return Ok(HandlerResult::new());
        };
        let value = self
            .read_optional(session_id, field.data_type())
            .await?
            .unwrap_or_default();
        Ok(HandlerResult::with_content(value))
    }
}

fn field_for_symbol(symbol: &str) -> Option<ProfileField> {
    let field = if symbol.contains("first_name") {
        ProfileField::FirstName
    } else if symbol.contains("family_name") {
        ProfileField::FamilyName
    } else if symbol.contains("gender") {
        ProfileField::Gender
    } else if symbol.contains("yob") {
        ProfileField::YearOfBirth
    } else if symbol.contains("location") {
        ProfileField::Location
    } else if symbol.contains("offerings") {
        ProfileField::Offerings
    } else {
        return None;
    };
    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, request_with, SESSION};

    #[tokio::test]
    async fn test_registration_buffers_then_commits() {
        let (h, _) = handlers();
        h.save_firstname(&request(), "Amina").await.unwrap();
        h.save_familyname(&request(), "Otieno").await.unwrap();
        assert!(h
            .read_optional(SESSION, DataType::FIRST_NAME)
            .await
            .unwrap()
            .is_none());

        let res = h
            .update_all_profile_items(&request_with(&h, &["flag_allow_update"]), "")
            .await
            .unwrap();
        assert!(res.leaves_set(h.flag("flag_firstname_set").unwrap()));
        assert!(res.leaves_set(h.flag("flag_familyname_set").unwrap()));
        assert!(!res.leaves_set(h.flag("flag_gender_set").unwrap()));
        assert_eq!(
            h.read_required(SESSION, DataType::FIRST_NAME).await.unwrap(),
            "Amina"
        );
        assert_eq!(
            h.read_required(SESSION, DataType::FAMILY_NAME).await.unwrap(),
            "Otieno"
        );
    }

    #[tokio::test]
    async fn test_edit_commits_after_authorization() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::LOCATION, "Kilifi").await.unwrap();

        let before = request_with(&h, &["flag_location_set"]);
        h.save_location(&before, "Mombasa").await.unwrap();
        assert_eq!(
            h.read_required(SESSION, DataType::LOCATION).await.unwrap(),
            "Kilifi"
        );

        let after = request_with(&h, &["flag_location_set", "flag_allow_update"]);
        h.save_location(&after, "").await.unwrap();
        assert_eq!(
            h.read_required(SESSION, DataType::LOCATION).await.unwrap(),
            "Mombasa"
        );
    }

    #[tokio::test]
    async fn test_profile_info() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::FIRST_NAME, "Amina").await.unwrap();
        h.write(SESSION, DataType::GENDER, "female").await.unwrap();
        let res = h.get_profile_info(&request(), "").await.unwrap();
        assert!(res.content.starts_with("Name: Amina\nGender: female\nAge: Not provided"));
    }

    #[tokio::test]
    async fn test_verify_yob() {
        let (h, _) = handlers();
        let flag = h.flag("flag_incorrect_date_format").unwrap();
        assert!(h.verify_yob(&request(), "1988").await.unwrap().leaves_reset(flag));
        assert!(h.verify_yob(&request(), "88").await.unwrap().leaves_set(flag));
    }

    #[test]
    fn test_field_for_symbol() {
        assert_eq!(field_for_symbol("edit_first_name"), Some(ProfileField::FirstName));
        assert_eq!(field_for_symbol("edit_yob"), Some(ProfileField::YearOfBirth));
        assert_eq!(field_for_symbol("main"), None);
    }
}

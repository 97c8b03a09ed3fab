/// Declares the closed opcode set along with the integer mapping in both directions.
macro_rules! opcodes {
    ($($name:ident = $code:literal,)+) => {
        /// Event command operation codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name,)+
            /// An opcode this decoder does not know, e.g. one added by an engine plugin.
            Unknown(i64),
        }

        impl Opcode {
            pub fn from_code(code: i64) -> Self {
                match code {
                    $($code => Opcode::$name,)+
                    other => Opcode::Unknown(other),
                }
            }

            pub fn code(self) -> i64 {
                match self {
                    $(Opcode::$name => $code,)+
                    Opcode::Unknown(code) => code,
                }
            }
        }
    };
}

opcodes! {
    End = 0,
    ShowText = 101,
    ShowChoices = 102,
    InputNumber = 103,
    SelectItem = 104,
    ScrollingText = 105,
    Comment = 108,
    ConditionalBranch = 111,
    Loop = 112,
    BreakLoop = 113,
    ExitEvent = 115,
    CommonEvent = 117,
    Label = 118,
    JumpToLabel = 119,
    ControlSwitches = 121,
    ControlVariables = 122,
    ControlSelfSwitch = 123,
    ControlTimer = 124,
    ChangeGold = 125,
    ChangeItems = 126,
    ChangeWeapons = 127,
    ChangeArmors = 128,
    ChangePartyMember = 129,
    ChangeBattleBgm = 132,
    ChangeVictoryMe = 133,
    ChangeSaveAccess = 134,
    ChangeMenuAccess = 135,
    ChangeEncounter = 136,
    ChangeFormationAccess = 137,
    ChangeWindowColor = 138,
    ChangeDefeatMe = 139,
    ChangeVehicleBgm = 140,
    TransferPlayer = 201,
    SetVehicleLocation = 202,
    SetEventLocation = 203,
    ScrollMap = 204,
    SetMovementRoute = 205,
    GetOnOffVehicle = 206,
    ChangeTransparency = 211,
    ShowAnimation = 212,
    ShowBalloon = 213,
    EraseEvent = 214,
    ChangePlayerFollowers = 216,
    GatherFollowers = 217,
    FadeoutScreen = 221,
    FadeinScreen = 222,
    TintScreen = 223,
    FlashScreen = 224,
    ShakeScreen = 225,
    Wait = 230,
    ShowPicture = 231,
    MovePicture = 232,
    RotatePicture = 233,
    TintPicture = 234,
    ErasePicture = 235,
    PlayBgm = 241,
    FadeoutBgm = 242,
    SaveBgm = 243,
    ResumeBgm = 244,
    PlayBgs = 245,
    FadeoutBgs = 246,
    PlaySe = 250,
    StopSe = 251,
    PlayMovie = 261,
    ChangeMapNameDisplay = 281,
    ChangeTileset = 282,
    ChangeBattleBack = 283,
    ChangeParallax = 284,
    BattleProcessing = 301,
    ShopProcessing = 302,
    NameInput = 303,
    ChangeHp = 311,
    ChangeMp = 312,
    ChangeState = 313,
    RecoverAll = 314,
    ChangeExp = 315,
    ChangeLevel = 316,
    ChangeParameter = 317,
    ChangeSkill = 318,
    ChangeEquipment = 319,
    ChangeName = 320,
    ChangeClass = 321,
    ChangeActorImages = 322,
    ChangeVehicleImage = 323,
    ChangeEnemyHp = 331,
    ChangeEnemyMp = 332,
    ChangeEnemyState = 333,
    EnemyRecoverAll = 334,
    EnemyAppear = 335,
    EnemyTransform = 336,
    AbortBattle = 340,
    ForceAction = 342,
    Script = 355,
    PluginCommand = 356,
    TextLine = 401,
    WhenChoice = 402,
    WhenCancel = 403,
    ChoicesEnd = 404,
    ScrollingTextLine = 405,
    CommentLine = 408,
    Else = 411,
    BranchEnd = 412,
    RepeatAbove = 413,
    MoveRouteStep = 505,
    IfWin = 601,
    IfEscape = 602,
    IfLose = 603,
    BattleEnd = 604,
    ShopItem = 605,
    ScriptLine = 655,
}

impl Opcode {
    /// Dialogue, choice, scrolling-text and scripting opcodes. A page containing any of them
    /// tells a story rather than spawning a wandering encounter.
    pub fn is_story(self) -> bool {
        matches!(
            self,
            Opcode::ShowText
                | Opcode::TextLine
                | Opcode::ShowChoices
                | Opcode::WhenChoice
                | Opcode::WhenCancel
                | Opcode::ScrollingText
                | Opcode::ScrollingTextLine
                | Opcode::Script
                | Opcode::PluginCommand
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_both_ways() {
        assert_eq!(Opcode::from_code(101), Opcode::ShowText);
        assert_eq!(Opcode::from_code(605).code(), 605);
        assert_eq!(Opcode::from_code(9999), Opcode::Unknown(9999));
        assert_eq!(Opcode::Unknown(9999).code(), 9999);
    }

    #[test]
    fn test_story_opcodes() {
        assert!(Opcode::ShowText.is_story());
        assert!(Opcode::PluginCommand.is_story());
        assert!(!Opcode::BattleProcessing.is_story());
        assert!(!Opcode::Unknown(101).is_story());
    }
}
